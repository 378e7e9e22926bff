//! Repository layer: entity-scoped database operations.
//!
//! Every function takes a plain `&Connection`; a `rusqlite::Transaction`
//! derefs to one, so callers compose several writes atomically by
//! passing `&tx`.

mod account;
mod appointment;
mod billing;
mod department;
mod employee;
mod lab_order;
mod patient;
mod pharmacy_order;
mod prescription;

use rusqlite::types::Type;

pub use account::*;
pub use appointment::*;
pub use billing::*;
pub use department::*;
pub use employee::*;
pub use lab_order::*;
pub use patient::*;
pub use pharmacy_order::*;
pub use prescription::*;

/// Decode a JSON text column inside a row mapper.
pub(crate) fn json_column<T: serde::de::DeserializeOwned>(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::NaiveDate;
    use rusqlite::Connection;

    use super::*;
    use crate::models::*;

    pub fn doctor_fields(department_id: i64, first: &str, last: &str) -> EmployeeFields {
        EmployeeFields {
            first_name: first.into(),
            last_name: last.into(),
            age: Some(41),
            gender: Gender::Female,
            phone: "555-0101".into(),
            role: Role::Doctor,
            department_id: Some(department_id),
        }
    }

    pub fn make_doctor(conn: &Connection, first: &str, last: &str) -> Employee {
        let dept = match list_departments(conn).unwrap().into_iter().next() {
            Some(d) => d,
            None => insert_department(conn, "Cardiology").unwrap(),
        };
        insert_employee(conn, &doctor_fields(dept.id, first, last)).unwrap()
    }

    pub fn make_patient(conn: &Connection, name: &str) -> Patient {
        insert_patient(
            conn,
            &PatientFields {
                full_name: name.into(),
                age: Some(30),
                gender: Gender::Male,
                phone: "555-0199".into(),
                address: "12 Elm St".into(),
            },
        )
        .unwrap()
    }

    pub fn make_appointment(conn: &Connection, doctor_id: i64, patient_id: i64) -> Appointment {
        insert_appointment(
            conn,
            &AppointmentFields {
                doctor_id,
                patient_id,
                appointment_datetime: NaiveDate::from_ymd_opt(2025, 3, 14)
                    .unwrap()
                    .and_hms_opt(9, 30, 0)
                    .unwrap(),
                reason: "Chest pain".into(),
            },
        )
        .unwrap()
    }
}
