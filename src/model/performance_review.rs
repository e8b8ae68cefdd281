use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, EnumString, AsRefStr, Display, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReviewStatus {
    Draft,
    InProgress,
    Completed,
    Approved,
}

impl ReviewStatus {
    pub fn is_editable(self) -> bool {
        matches!(self, ReviewStatus::Draft | ReviewStatus::InProgress)
    }

    pub fn can_transition_to(self, next: ReviewStatus) -> bool {
        matches!(
            (self, next),
            (ReviewStatus::Draft, ReviewStatus::InProgress)
                | (ReviewStatus::Draft, ReviewStatus::Completed)
                | (ReviewStatus::InProgress, ReviewStatus::Completed)
                | (ReviewStatus::Completed, ReviewStatus::Approved)
        )
    }
}

/// Ratings are a 1..=5 ordinal scale.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct PerformanceReview {
    pub id: u64,
    pub employee_id: u64,
    pub reviewer_id: u64,
    /// e.g. "2025-H1" or "2025-Q3"
    pub review_period: String,
    pub technical_rating: Option<u8>,
    pub communication_rating: Option<u8>,
    pub teamwork_rating: Option<u8>,
    pub leadership_rating: Option<u8>,
    pub punctuality_rating: Option<u8>,
    pub initiative_rating: Option<u8>,
    pub overall_rating: Option<u8>,
    pub strengths: Option<String>,
    pub improvements: Option<String>,
    pub goals: Option<String>,
    pub employee_comments: Option<String>,
    pub status: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editable_until_completed() {
        assert!(ReviewStatus::Draft.is_editable());
        assert!(ReviewStatus::InProgress.is_editable());
        assert!(!ReviewStatus::Completed.is_editable());
        assert!(!ReviewStatus::Approved.is_editable());
    }

    #[test]
    fn approved_is_terminal() {
        for next in [
            ReviewStatus::Draft,
            ReviewStatus::InProgress,
            ReviewStatus::Completed,
        ] {
            assert!(!ReviewStatus::Approved.can_transition_to(next));
        }
        assert!(ReviewStatus::Completed.can_transition_to(ReviewStatus::Approved));
    }
}
