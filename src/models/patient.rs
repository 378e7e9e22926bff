use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::Gender;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub full_name: String,
    pub age: Option<u16>,
    pub gender: Gender,
    pub phone: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatientFields {
    pub full_name: String,
    pub age: Option<u16>,
    pub gender: Gender,
    pub phone: String,
    pub address: String,
}
