use serde::Deserialize;

use super::enums::AppointmentStatus;

/// Optional constraints for appointment listings; unset fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentFilter {
    pub doctor_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub status: Option<AppointmentStatus>,
}
