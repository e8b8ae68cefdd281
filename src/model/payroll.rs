use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, EnumString, AsRefStr, Display, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PayrollStatus {
    Draft,
    Processed,
    Paid,
    Cancelled,
}

impl PayrollStatus {
    pub fn is_editable(self) -> bool {
        self == PayrollStatus::Draft
    }

    /// process() walks draft -> processed -> paid, one step per call.
    pub fn next_processing_step(self) -> Option<PayrollStatus> {
        match self {
            PayrollStatus::Draft => Some(PayrollStatus::Processed),
            PayrollStatus::Processed => Some(PayrollStatus::Paid),
            PayrollStatus::Paid | PayrollStatus::Cancelled => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payroll {
    pub id: u64,
    pub employee_id: u64,
    /// Year-month identifier, e.g. "2025-03". One row per (employee, period).
    pub pay_period: String,
    pub basic_salary: f64,
    pub allowances: f64,
    pub overtime: f64,
    pub bonus: f64,
    pub commission: f64,
    pub deductions: f64,
    pub tax_deduction: f64,
    pub provident_fund: f64,
    pub insurance: f64,
    pub gross_salary: f64,
    pub net_salary: f64,
    pub status: String,
    pub processed_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_draft_is_editable() {
        assert!(PayrollStatus::Draft.is_editable());
        assert!(!PayrollStatus::Processed.is_editable());
        assert!(!PayrollStatus::Paid.is_editable());
    }

    #[test]
    fn processing_advances_one_step_and_stops_at_paid() {
        assert_eq!(
            PayrollStatus::Draft.next_processing_step(),
            Some(PayrollStatus::Processed)
        );
        assert_eq!(
            PayrollStatus::Processed.next_processing_step(),
            Some(PayrollStatus::Paid)
        );
        assert_eq!(PayrollStatus::Paid.next_processing_step(), None);
        assert_eq!(PayrollStatus::Cancelled.next_processing_step(), None);
    }
}
