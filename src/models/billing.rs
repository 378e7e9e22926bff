use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::enums::BillType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingRecord {
    pub id: i64,
    pub bill_type: BillType,
    pub patient_name: String,
    pub amount: f64,
    pub additional_info: Value,
    pub created_at: DateTime<Utc>,
}
