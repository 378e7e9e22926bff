//! Lab technician operations on lab orders.

use rusqlite::Connection;

use crate::db::{self, DatabaseError};
use crate::models::LabOrder;

#[derive(Debug, thiserror::Error)]
pub enum LaboratoryError {
    #[error("Lab order not found")]
    NotFound,
    #[error("Lab order already processed")]
    AlreadyProcessed,
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

pub fn list_lab_orders(conn: &Connection, processed: Option<bool>) -> Result<Vec<LabOrder>, LaboratoryError> {
    Ok(db::list_lab_orders(conn, processed)?)
}

pub fn get_lab_order(conn: &Connection, id: i64) -> Result<LabOrder, LaboratoryError> {
    db::get_lab_order(conn, id)?.ok_or(LaboratoryError::NotFound)
}

pub fn process_lab_order(conn: &Connection, id: i64) -> Result<LabOrder, LaboratoryError> {
    get_lab_order(conn, id)?;
    if !db::mark_lab_order_processed(conn, id)? {
        return Err(LaboratoryError::AlreadyProcessed);
    }
    tracing::info!(lab_order_id = id, "Lab order processed");
    get_lab_order(conn, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{make_appointment, make_doctor, make_patient};
    use crate::db::open_memory_database;
    use crate::models::LabTest;

    #[test]
    fn processed_once_and_filtered() {
        let conn = open_memory_database().unwrap();
        let doctor = make_doctor(&conn, "Ann", "Lee");
        let patient = make_patient(&conn, "Tom Hart");
        let appt = make_appointment(&conn, doctor.id, patient.id);
        let tests = vec![LabTest { test: "CBC".into(), price: 100.0, extra: Default::default() }];
        let order = db::insert_lab_order(&conn, &appt, doctor.id, &tests).unwrap();

        assert_eq!(list_lab_orders(&conn, Some(false)).unwrap().len(), 1);
        assert!(process_lab_order(&conn, order.id).unwrap().is_processed);
        assert_eq!(list_lab_orders(&conn, Some(true)).unwrap().len(), 1);
        assert!(list_lab_orders(&conn, Some(false)).unwrap().is_empty());
        assert!(matches!(process_lab_order(&conn, order.id), Err(LaboratoryError::AlreadyProcessed)));
        assert!(matches!(get_lab_order(&conn, 99), Err(LaboratoryError::NotFound)));
    }
}
