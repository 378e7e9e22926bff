use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: i64,
    pub appointment_id: i64,
    pub doctor_id: Option<i64>,
    pub patient_id: i64,
    pub notes: Option<String>,
    pub diagnosis: Option<String>,
    pub is_dispensed: bool,
    pub items: Vec<PrescriptionItem>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionItem {
    pub id: i64,
    pub medicine_name: String,
    pub dosage: Option<String>,
    pub duration: Option<String>,
    pub instructions: Option<String>,
}

/// Medicine line as submitted by a doctor, before it has an id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewPrescriptionItem {
    #[serde(default)]
    pub medicine_name: String,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}
