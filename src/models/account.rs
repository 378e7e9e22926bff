use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::Role;

/// Login account. The password hash never leaves the repository layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
}

/// Account listing row joined with the linked staff profile, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub is_active: bool,
    pub employee_name: Option<String>,
    pub role: Option<Role>,
    pub date_joined: DateTime<Utc>,
}
