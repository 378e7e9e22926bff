use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::json_column;
use crate::db::DatabaseError;
use crate::models::*;

const LAB_ORDER_COLUMNS: &str =
    "id, appointment_id, doctor_id, patient_id, tests, is_processed, created_at";

fn lab_order_from_row(row: &Row<'_>) -> rusqlite::Result<LabOrder> {
    Ok(LabOrder {
        id: row.get(0)?,
        appointment_id: row.get(1)?,
        doctor_id: row.get(2)?,
        patient_id: row.get(3)?,
        tests: json_column(row, 4)?,
        is_processed: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn insert_lab_order(
    conn: &Connection,
    appointment: &Appointment,
    doctor_id: i64,
    tests: &[LabTest],
) -> Result<LabOrder, DatabaseError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO lab_orders (appointment_id, doctor_id, patient_id, tests, is_processed, created_at)
         VALUES (?1, ?2, ?3, ?4, 0, ?5)",
        params![
            appointment.id,
            doctor_id,
            appointment.patient_id,
            serde_json::to_string(tests)?,
            now,
        ],
    )?;
    Ok(LabOrder {
        id: conn.last_insert_rowid(),
        appointment_id: appointment.id,
        doctor_id: Some(doctor_id),
        patient_id: appointment.patient_id,
        tests: tests.to_vec(),
        is_processed: false,
        created_at: now,
    })
}

pub fn get_lab_order(conn: &Connection, id: i64) -> Result<Option<LabOrder>, DatabaseError> {
    let order = conn
        .query_row(
            &format!("SELECT {LAB_ORDER_COLUMNS} FROM lab_orders WHERE id = ?1"),
            params![id],
            lab_order_from_row,
        )
        .optional()?;
    Ok(order)
}

/// Lab orders newest first, optionally filtered on the processed flag.
pub fn list_lab_orders(conn: &Connection, processed: Option<bool>) -> Result<Vec<LabOrder>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LAB_ORDER_COLUMNS} FROM lab_orders
         WHERE (?1 IS NULL OR is_processed = ?1)
         ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map(params![processed], lab_order_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Flip `is_processed` to true. Returns false when it was already set.
pub fn mark_lab_order_processed(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE lab_orders SET is_processed = 1 WHERE id = ?1 AND is_processed = 0",
        params![id],
    )?;
    Ok(updated == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{make_appointment, make_doctor, make_patient};
    use crate::db::open_memory_database;
    use serde_json::{json, Map};

    #[test]
    fn tests_round_trip_with_extra_keys() {
        let conn = open_memory_database().unwrap();
        let doctor = make_doctor(&conn, "Jane", "Smith");
        let patient = make_patient(&conn, "Amy Pond");
        let appt = make_appointment(&conn, doctor.id, patient.id);

        let mut extra = Map::new();
        extra.insert("fasting".into(), json!(true));
        let tests = vec![LabTest { test: "CBC".into(), price: 100.0, extra }];
        let order = insert_lab_order(&conn, &appt, doctor.id, &tests).unwrap();

        let loaded = get_lab_order(&conn, order.id).unwrap().unwrap();
        assert_eq!(loaded.tests, tests);
        assert_eq!(loaded.tests[0].extra["fasting"], json!(true));
        assert!(!loaded.is_processed);
    }

    #[test]
    fn processed_filter_and_flip() {
        let conn = open_memory_database().unwrap();
        let doctor = make_doctor(&conn, "Jane", "Smith");
        let patient = make_patient(&conn, "Amy Pond");
        let appt = make_appointment(&conn, doctor.id, patient.id);
        let order = insert_lab_order(&conn, &appt, doctor.id, &[]).unwrap();

        assert_eq!(list_lab_orders(&conn, Some(false)).unwrap().len(), 1);
        assert!(mark_lab_order_processed(&conn, order.id).unwrap());
        assert!(!mark_lab_order_processed(&conn, order.id).unwrap());
        assert_eq!(list_lab_orders(&conn, Some(true)).unwrap().len(), 1);
        assert_eq!(list_lab_orders(&conn, None).unwrap().len(), 1);
    }
}
