use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, EnumString, AsRefStr, Display, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveType {
    Annual,
    Sick,
    Casual,
    Unpaid,
    Maternity,
    Paternity,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, EnumString, AsRefStr, Display, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    /// Edits and owner-deletes are only allowed while the request is open.
    pub fn is_editable(self) -> bool {
        self == LeaveStatus::Pending
    }

    pub fn can_transition_to(self, next: LeaveStatus) -> bool {
        matches!(
            (self, next),
            (LeaveStatus::Pending, LeaveStatus::Approved)
                | (LeaveStatus::Pending, LeaveStatus::Rejected)
                | (LeaveStatus::Pending, LeaveStatus::Cancelled)
                | (LeaveStatus::Approved, LeaveStatus::Cancelled)
        )
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeaveRequest {
    pub id: u64,
    pub employee_id: u64,
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub day_count: u32,
    pub status: String,
    pub approved_by: Option<u64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approver_comments: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn pending_is_the_only_editable_state() {
        assert!(LeaveStatus::Pending.is_editable());
        assert!(!LeaveStatus::Approved.is_editable());
        assert!(!LeaveStatus::Rejected.is_editable());
        assert!(!LeaveStatus::Cancelled.is_editable());
    }

    #[test]
    fn approve_and_reject_only_from_pending() {
        assert!(LeaveStatus::Pending.can_transition_to(LeaveStatus::Approved));
        assert!(LeaveStatus::Pending.can_transition_to(LeaveStatus::Rejected));
        assert!(!LeaveStatus::Rejected.can_transition_to(LeaveStatus::Approved));
        assert!(!LeaveStatus::Cancelled.can_transition_to(LeaveStatus::Approved));
    }

    #[test]
    fn owner_may_cancel_pending_or_approved() {
        assert!(LeaveStatus::Pending.can_transition_to(LeaveStatus::Cancelled));
        assert!(LeaveStatus::Approved.can_transition_to(LeaveStatus::Cancelled));
        assert!(!LeaveStatus::Rejected.can_transition_to(LeaveStatus::Cancelled));
    }

    #[test]
    fn status_round_trips_through_snake_case() {
        assert_eq!(LeaveStatus::Pending.as_ref(), "pending");
        assert_eq!(LeaveStatus::from_str("approved").unwrap(), LeaveStatus::Approved);
        assert_eq!(LeaveType::from_str("sick").unwrap(), LeaveType::Sick);
        assert!(LeaveType::from_str("sabbatical").is_err());
    }
}
