use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::models::*;

const PATIENT_COLUMNS: &str = "id, full_name, age, gender, phone, address, created_at";

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        full_name: row.get(1)?,
        age: row.get(2)?,
        gender: row.get(3)?,
        phone: row.get(4)?,
        address: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn insert_patient(conn: &Connection, fields: &PatientFields) -> Result<Patient, DatabaseError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO patients (full_name, age, gender, phone, address, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            fields.full_name,
            fields.age,
            fields.gender,
            fields.phone,
            fields.address,
            now,
        ],
    )?;
    Ok(Patient {
        id: conn.last_insert_rowid(),
        full_name: fields.full_name.clone(),
        age: fields.age,
        gender: fields.gender,
        phone: fields.phone.clone(),
        address: fields.address.clone(),
        created_at: now,
    })
}

pub fn get_patient(conn: &Connection, id: i64) -> Result<Option<Patient>, DatabaseError> {
    let patient = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
            params![id],
            patient_from_row,
        )
        .optional()?;
    Ok(patient)
}

/// Patients ordered by name, optionally narrowed to names containing `search`.
pub fn list_patients(conn: &Connection, search: Option<&str>) -> Result<Vec<Patient>, DatabaseError> {
    let pattern = search.map(|s| format!("%{}%", s.trim()));
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients
         WHERE (?1 IS NULL OR full_name LIKE ?1)
         ORDER BY full_name, id"
    ))?;
    let rows = stmt.query_map(params![pattern], patient_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn update_patient(conn: &Connection, id: i64, fields: &PatientFields) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE patients SET full_name = ?1, age = ?2, gender = ?3, phone = ?4, address = ?5
         WHERE id = ?6",
        params![
            fields.full_name,
            fields.age,
            fields.gender,
            fields.phone,
            fields.address,
            id,
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("Patient", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::make_patient;
    use crate::db::open_memory_database;

    #[test]
    fn search_matches_substring() {
        let conn = open_memory_database().unwrap();
        make_patient(&conn, "John Carter");
        make_patient(&conn, "Amy Pond");
        make_patient(&conn, "Johnny Bravo");

        assert_eq!(list_patients(&conn, None).unwrap().len(), 3);
        let johns = list_patients(&conn, Some("john")).unwrap();
        assert_eq!(johns.len(), 2);
        assert_eq!(johns[0].full_name, "John Carter");
    }

    #[test]
    fn update_changes_fields() {
        let conn = open_memory_database().unwrap();
        let patient = make_patient(&conn, "Amy Pond");
        let mut fields = PatientFields {
            full_name: patient.full_name.clone(),
            age: patient.age,
            gender: patient.gender,
            phone: patient.phone.clone(),
            address: patient.address.clone(),
        };
        fields.phone = "555-0000".into();
        update_patient(&conn, patient.id, &fields).unwrap();
        assert_eq!(get_patient(&conn, patient.id).unwrap().unwrap().phone, "555-0000");
        assert!(update_patient(&conn, 999, &fields).is_err());
    }
}
