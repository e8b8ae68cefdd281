use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, EnumString, AsRefStr, Display, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ComplianceType {
    Training,
    Certification,
    Document,
    PolicyAcknowledgement,
    BackgroundCheck,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, EnumString, AsRefStr, Display, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ComplianceStatus {
    Pending,
    Completed,
    Expired,
    NotApplicable,
}

impl ComplianceStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ComplianceStatus::Completed | ComplianceStatus::Expired | ComplianceStatus::NotApplicable
        )
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct ComplianceItem {
    pub id: u64,
    pub employee_id: u64,
    pub compliance_type: String,
    pub title: String,
    pub status: String,
    pub due_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub completed_date: Option<NaiveDate>,
    pub verified_by: Option<u64>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}
