use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::json_column;
use crate::db::DatabaseError;
use crate::models::*;

const PHARMACY_ORDER_COLUMNS: &str =
    "id, appointment_id, doctor_id, patient_id, items, is_dispensed, created_at";

fn pharmacy_order_from_row(row: &Row<'_>) -> rusqlite::Result<PharmacyOrder> {
    Ok(PharmacyOrder {
        id: row.get(0)?,
        appointment_id: row.get(1)?,
        doctor_id: row.get(2)?,
        patient_id: row.get(3)?,
        items: json_column(row, 4)?,
        is_dispensed: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn insert_pharmacy_order(
    conn: &Connection,
    appointment: &Appointment,
    doctor_id: i64,
    items: &[PharmacyItem],
) -> Result<PharmacyOrder, DatabaseError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO pharmacy_orders (appointment_id, doctor_id, patient_id, items, is_dispensed, created_at)
         VALUES (?1, ?2, ?3, ?4, 0, ?5)",
        params![
            appointment.id,
            doctor_id,
            appointment.patient_id,
            serde_json::to_string(items)?,
            now,
        ],
    )?;
    Ok(PharmacyOrder {
        id: conn.last_insert_rowid(),
        appointment_id: appointment.id,
        doctor_id: Some(doctor_id),
        patient_id: appointment.patient_id,
        items: items.to_vec(),
        is_dispensed: false,
        created_at: now,
    })
}

pub fn get_pharmacy_order(conn: &Connection, id: i64) -> Result<Option<PharmacyOrder>, DatabaseError> {
    let order = conn
        .query_row(
            &format!("SELECT {PHARMACY_ORDER_COLUMNS} FROM pharmacy_orders WHERE id = ?1"),
            params![id],
            pharmacy_order_from_row,
        )
        .optional()?;
    Ok(order)
}

pub fn list_pharmacy_orders(
    conn: &Connection,
    dispensed: Option<bool>,
) -> Result<Vec<PharmacyOrder>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PHARMACY_ORDER_COLUMNS} FROM pharmacy_orders
         WHERE (?1 IS NULL OR is_dispensed = ?1)
         ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map(params![dispensed], pharmacy_order_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Flip `is_dispensed` to true. Returns false when it was already set.
pub fn mark_pharmacy_order_dispensed(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE pharmacy_orders SET is_dispensed = 1 WHERE id = ?1 AND is_dispensed = 0",
        params![id],
    )?;
    Ok(updated == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{make_appointment, make_doctor, make_patient};
    use crate::db::open_memory_database;
    use serde_json::Map;

    #[test]
    fn items_persist_and_dispense() {
        let conn = open_memory_database().unwrap();
        let doctor = make_doctor(&conn, "Jane", "Smith");
        let patient = make_patient(&conn, "Amy Pond");
        let appt = make_appointment(&conn, doctor.id, patient.id);
        let items = vec![PharmacyItem {
            name: "Paracetamol".into(),
            qty: 2,
            price: 20.0,
            extra: Map::new(),
        }];

        let order = insert_pharmacy_order(&conn, &appt, doctor.id, &items).unwrap();
        let loaded = get_pharmacy_order(&conn, order.id).unwrap().unwrap();
        assert_eq!(loaded.items, items);
        assert_eq!(loaded.appointment_id, appt.id);

        assert!(mark_pharmacy_order_dispensed(&conn, order.id).unwrap());
        assert!(!mark_pharmacy_order_dispensed(&conn, order.id).unwrap());
        assert!(list_pharmacy_orders(&conn, Some(false)).unwrap().is_empty());
    }
}
