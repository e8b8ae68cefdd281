use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct CustomerAddress {
    pub id: u64,
    pub customer_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state_code: String,
    pub pincode: String,
    pub gstin: Option<String>,
    pub created_by: u64,
    pub created_at: Option<DateTime<Utc>>,
}
