use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bill {
    pub id: u64,
    pub bill_no: String,
    pub vendor_name: String,
    pub vendor_gstin: Option<String>,
    pub vendor_state_code: String,
    pub bill_date: NaiveDate,
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
pub struct BillItem {
    pub id: u64,
    pub bill_id: u64,
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
    pub gst_rate: f64,
    pub amount: f64,
    pub tax: f64,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct BillPayment {
    pub id: u64,
    pub bill_id: u64,
    pub amount: f64,
    pub mode: String,
    pub reference: Option<String>,
    pub paid_on: NaiveDate,
}
