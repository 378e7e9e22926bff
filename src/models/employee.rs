use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::department::Department;
use super::enums::{Gender, Role};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub age: Option<u16>,
    pub gender: Gender,
    pub phone: String,
    pub role: Role,
    pub department_id: Option<i64>,
    pub account_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// `"Jane Smith (Doctor)"`
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.full_name(), self.role.display_name())
    }
}

/// Validated field set for inserting or overwriting an employee.
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeFields {
    pub first_name: String,
    pub last_name: String,
    pub age: Option<u16>,
    pub gender: Gender,
    pub phone: String,
    pub role: Role,
    pub department_id: Option<i64>,
}

/// Employee row with its department nested and the linked account's username.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeRecord {
    #[serde(flatten)]
    pub employee: Employee,
    pub department: Option<Department>,
    pub username: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee(first: &str, last: &str, role: Role) -> Employee {
        let now = Utc::now();
        Employee {
            id: 1,
            first_name: first.into(),
            last_name: last.into(),
            age: None,
            gender: Gender::Other,
            phone: String::new(),
            role,
            department_id: None,
            account_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn display_name_includes_role_label() {
        let e = employee("Jane", "Smith", Role::LabTechnician);
        assert_eq!(e.display_name(), "Jane Smith (Lab Technician)");
    }

    #[test]
    fn full_name_trims_missing_last_name() {
        let e = employee("Cher", "", Role::Receptionist);
        assert_eq!(e.full_name(), "Cher");
    }
}
