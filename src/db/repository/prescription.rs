use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::models::*;

const PRESCRIPTION_COLUMNS: &str =
    "id, appointment_id, doctor_id, patient_id, notes, diagnosis, is_dispensed, created_at";

fn prescription_from_row(row: &Row<'_>) -> rusqlite::Result<Prescription> {
    Ok(Prescription {
        id: row.get(0)?,
        appointment_id: row.get(1)?,
        doctor_id: row.get(2)?,
        patient_id: row.get(3)?,
        notes: row.get(4)?,
        diagnosis: row.get(5)?,
        is_dispensed: row.get(6)?,
        items: Vec::new(),
        created_at: row.get(7)?,
    })
}

/// Insert the prescription header. Items are added separately.
pub fn insert_prescription(
    conn: &Connection,
    appointment: &Appointment,
    doctor_id: i64,
    notes: Option<&str>,
    diagnosis: Option<&str>,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO prescriptions (appointment_id, doctor_id, patient_id, notes, diagnosis, is_dispensed, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
        params![
            appointment.id,
            doctor_id,
            appointment.patient_id,
            notes,
            diagnosis,
            Utc::now(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_prescription_item(
    conn: &Connection,
    prescription_id: i64,
    item: &NewPrescriptionItem,
) -> Result<PrescriptionItem, DatabaseError> {
    conn.execute(
        "INSERT INTO prescription_items (prescription_id, medicine_name, dosage, duration, instructions)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            prescription_id,
            item.medicine_name,
            item.dosage,
            item.duration,
            item.instructions,
        ],
    )?;
    Ok(PrescriptionItem {
        id: conn.last_insert_rowid(),
        medicine_name: item.medicine_name.clone(),
        dosage: item.dosage.clone(),
        duration: item.duration.clone(),
        instructions: item.instructions.clone(),
    })
}

fn load_items(conn: &Connection, prescription_id: i64) -> Result<Vec<PrescriptionItem>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, medicine_name, dosage, duration, instructions
         FROM prescription_items WHERE prescription_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![prescription_id], |row| {
        Ok(PrescriptionItem {
            id: row.get(0)?,
            medicine_name: row.get(1)?,
            dosage: row.get(2)?,
            duration: row.get(3)?,
            instructions: row.get(4)?,
        })
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

fn with_items(conn: &Connection, found: Option<Prescription>) -> Result<Option<Prescription>, DatabaseError> {
    match found {
        Some(mut prescription) => {
            prescription.items = load_items(conn, prescription.id)?;
            Ok(Some(prescription))
        }
        None => Ok(None),
    }
}

pub fn get_prescription(conn: &Connection, id: i64) -> Result<Option<Prescription>, DatabaseError> {
    let found = conn
        .query_row(
            &format!("SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE id = ?1"),
            params![id],
            prescription_from_row,
        )
        .optional()?;
    with_items(conn, found)
}

pub fn get_prescription_by_appointment(
    conn: &Connection,
    appointment_id: i64,
) -> Result<Option<Prescription>, DatabaseError> {
    let found = conn
        .query_row(
            &format!("SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE appointment_id = ?1"),
            params![appointment_id],
            prescription_from_row,
        )
        .optional()?;
    with_items(conn, found)
}

/// Prescriptions newest first, optionally filtered on the dispensed flag.
pub fn list_prescriptions(
    conn: &Connection,
    dispensed: Option<bool>,
) -> Result<Vec<Prescription>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions
         WHERE (?1 IS NULL OR is_dispensed = ?1)
         ORDER BY created_at DESC, id DESC"
    ))?;
    let headers = stmt
        .query_map(params![dispensed], prescription_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    headers
        .into_iter()
        .map(|mut p| {
            p.items = load_items(conn, p.id)?;
            Ok(p)
        })
        .collect()
}

/// Flip `is_dispensed` to true. Returns false when it was already set.
pub fn mark_prescription_dispensed(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE prescriptions SET is_dispensed = 1 WHERE id = ?1 AND is_dispensed = 0",
        params![id],
    )?;
    Ok(updated == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{make_appointment, make_doctor, make_patient};
    use crate::db::open_memory_database;

    fn item(name: &str) -> NewPrescriptionItem {
        NewPrescriptionItem {
            medicine_name: name.into(),
            dosage: Some("500mg".into()),
            duration: Some("5 days".into()),
            instructions: None,
        }
    }

    #[test]
    fn prescription_loads_with_items() {
        let conn = open_memory_database().unwrap();
        let doctor = make_doctor(&conn, "Jane", "Smith");
        let patient = make_patient(&conn, "Amy Pond");
        let appt = make_appointment(&conn, doctor.id, patient.id);

        let id = insert_prescription(&conn, &appt, doctor.id, Some("rest"), Some("flu")).unwrap();
        insert_prescription_item(&conn, id, &item("Paracetamol")).unwrap();
        insert_prescription_item(&conn, id, &item("Ibuprofen")).unwrap();

        let loaded = get_prescription_by_appointment(&conn, appt.id).unwrap().unwrap();
        assert_eq!(loaded.id, id);
        assert_eq!(loaded.patient_id, patient.id);
        assert_eq!(loaded.items.len(), 2);
        assert_eq!(loaded.items[0].medicine_name, "Paracetamol");
    }

    #[test]
    fn one_prescription_per_appointment() {
        let conn = open_memory_database().unwrap();
        let doctor = make_doctor(&conn, "Jane", "Smith");
        let patient = make_patient(&conn, "Amy Pond");
        let appt = make_appointment(&conn, doctor.id, patient.id);

        insert_prescription(&conn, &appt, doctor.id, None, None).unwrap();
        let err = insert_prescription(&conn, &appt, doctor.id, None, None).unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn dispense_only_once() {
        let conn = open_memory_database().unwrap();
        let doctor = make_doctor(&conn, "Jane", "Smith");
        let patient = make_patient(&conn, "Amy Pond");
        let appt = make_appointment(&conn, doctor.id, patient.id);
        let id = insert_prescription(&conn, &appt, doctor.id, None, None).unwrap();

        assert_eq!(list_prescriptions(&conn, Some(false)).unwrap().len(), 1);
        assert!(mark_prescription_dispensed(&conn, id).unwrap());
        assert!(!mark_prescription_dispensed(&conn, id).unwrap());
        assert!(list_prescriptions(&conn, Some(false)).unwrap().is_empty());
        assert_eq!(list_prescriptions(&conn, Some(true)).unwrap().len(), 1);
    }
}
