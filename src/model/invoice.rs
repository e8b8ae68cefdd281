use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Lifecycle shared by invoices (sales side) and bills (purchase side).
#[derive(Debug, Serialize, Deserialize, ToSchema, EnumString, AsRefStr, Display, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Pending,
    Approved,
    Paid,
    Overdue,
    Cancelled,
}

impl DocumentStatus {
    pub fn is_editable(self) -> bool {
        self == DocumentStatus::Draft
    }

    pub fn can_transition_to(self, next: DocumentStatus) -> bool {
        matches!(
            (self, next),
            (DocumentStatus::Draft, DocumentStatus::Pending)
                | (DocumentStatus::Draft, DocumentStatus::Cancelled)
                | (DocumentStatus::Pending, DocumentStatus::Approved)
                | (DocumentStatus::Pending, DocumentStatus::Cancelled)
                | (DocumentStatus::Approved, DocumentStatus::Paid)
                | (DocumentStatus::Approved, DocumentStatus::Overdue)
                | (DocumentStatus::Approved, DocumentStatus::Cancelled)
                | (DocumentStatus::Overdue, DocumentStatus::Paid)
                | (DocumentStatus::Overdue, DocumentStatus::Cancelled)
        )
    }

    /// Payments may be recorded only once the document is out of draft and
    /// not cancelled or already settled.
    pub fn accepts_payments(self) -> bool {
        matches!(
            self,
            DocumentStatus::Pending | DocumentStatus::Approved | DocumentStatus::Overdue
        )
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invoice {
    pub id: u64,
    pub invoice_no: String,
    pub customer_name: String,
    pub customer_gstin: Option<String>,
    /// Two-digit GST state code of the customer's place of supply.
    pub customer_state_code: String,
    pub billing_address: Option<String>,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub subtotal: f64,
    pub cgst: f64,
    pub sgst: f64,
    pub igst: f64,
    pub cess: f64,
    pub grand_total: f64,
    pub paid_total: f64,
    pub status: String,
    pub created_by: u64,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct InvoiceItem {
    pub id: u64,
    pub invoice_id: u64,
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
    pub gst_rate: f64,
    pub amount: f64,
    pub tax: f64,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct InvoicePayment {
    pub id: u64,
    pub invoice_id: u64,
    pub amount: f64,
    pub mode: String,
    pub reference: Option<String>,
    pub paid_on: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_is_the_only_editable_state() {
        assert!(DocumentStatus::Draft.is_editable());
        for s in [
            DocumentStatus::Pending,
            DocumentStatus::Approved,
            DocumentStatus::Paid,
            DocumentStatus::Overdue,
            DocumentStatus::Cancelled,
        ] {
            assert!(!s.is_editable());
        }
    }

    #[test]
    fn lifecycle_follows_draft_pending_approved_paid() {
        assert!(DocumentStatus::Draft.can_transition_to(DocumentStatus::Pending));
        assert!(DocumentStatus::Pending.can_transition_to(DocumentStatus::Approved));
        assert!(DocumentStatus::Approved.can_transition_to(DocumentStatus::Paid));
        assert!(DocumentStatus::Approved.can_transition_to(DocumentStatus::Overdue));
        assert!(DocumentStatus::Overdue.can_transition_to(DocumentStatus::Paid));
    }

    #[test]
    fn paid_and_cancelled_are_terminal() {
        for next in [
            DocumentStatus::Draft,
            DocumentStatus::Pending,
            DocumentStatus::Approved,
            DocumentStatus::Overdue,
        ] {
            assert!(!DocumentStatus::Paid.can_transition_to(next));
            assert!(!DocumentStatus::Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn no_skipping_straight_from_draft_to_paid() {
        assert!(!DocumentStatus::Draft.can_transition_to(DocumentStatus::Paid));
        assert!(!DocumentStatus::Draft.can_transition_to(DocumentStatus::Approved));
    }
}
