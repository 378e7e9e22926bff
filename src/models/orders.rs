use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One requested lab test. Keys beyond `test` and `price` are kept as sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabTest {
    pub test: String,
    pub price: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One dispensed drug line. Keys beyond `name`, `qty` and `price` are kept as sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PharmacyItem {
    pub name: String,
    pub qty: u32,
    pub price: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabOrder {
    pub id: i64,
    pub appointment_id: i64,
    pub doctor_id: Option<i64>,
    pub patient_id: i64,
    pub tests: Vec<LabTest>,
    pub is_processed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PharmacyOrder {
    pub id: i64,
    pub appointment_id: i64,
    pub doctor_id: Option<i64>,
    pub patient_id: i64,
    pub items: Vec<PharmacyItem>,
    pub is_dispensed: bool,
    pub created_at: DateTime<Utc>,
}
