use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::AppointmentStatus;

/// Appointment joined with the patient and doctor display names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub doctor_id: Option<i64>,
    pub doctor_name: Option<String>,
    pub patient_id: i64,
    pub patient_name: String,
    pub appointment_datetime: NaiveDateTime,
    pub reason: String,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentFields {
    pub doctor_id: i64,
    pub patient_id: i64,
    pub appointment_datetime: NaiveDateTime,
    pub reason: String,
}
