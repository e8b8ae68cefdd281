use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, EnumString, AsRefStr, Display, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExportFormat {
    Csv,
    Xlsx,
    /// HTML stands in for PDF; print jobs request this format.
    Html,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, EnumString, AsRefStr, Display, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExportSource {
    Invoices,
    Bills,
    Payroll,
    Attendance,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, EnumString, AsRefStr, Display, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl ExportStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExportStatus::Completed | ExportStatus::Failed | ExportStatus::Cancelled
        )
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExportJob {
    pub id: u64,
    pub format: String,
    pub source: String,
    /// JSON snapshot of the list filters the export was requested with.
    pub filters: Option<String>,
    pub status: String,
    pub total_rows: u32,
    pub written_rows: u32,
    pub file_path: Option<String>,
    pub file_size: Option<u64>,
    pub error_message: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub download_count: u32,
    pub requested_by: u64,
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!ExportStatus::Pending.is_terminal());
        assert!(!ExportStatus::Processing.is_terminal());
        assert!(ExportStatus::Completed.is_terminal());
        assert!(ExportStatus::Failed.is_terminal());
        assert!(ExportStatus::Cancelled.is_terminal());
    }
}
