//! Pharmacist operations on pharmacy orders and prescriptions.

use rusqlite::Connection;

use crate::db::{self, DatabaseError};
use crate::models::*;

#[derive(Debug, thiserror::Error)]
pub enum DispensaryError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0} already dispensed")]
    AlreadyDispensed(&'static str),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

pub fn list_pharmacy_orders(
    conn: &Connection,
    dispensed: Option<bool>,
) -> Result<Vec<PharmacyOrder>, DispensaryError> {
    Ok(db::list_pharmacy_orders(conn, dispensed)?)
}

pub fn get_pharmacy_order(conn: &Connection, id: i64) -> Result<PharmacyOrder, DispensaryError> {
    db::get_pharmacy_order(conn, id)?.ok_or(DispensaryError::NotFound("Pharmacy order"))
}

pub fn dispense_pharmacy_order(conn: &Connection, id: i64) -> Result<PharmacyOrder, DispensaryError> {
    get_pharmacy_order(conn, id)?;
    if !db::mark_pharmacy_order_dispensed(conn, id)? {
        return Err(DispensaryError::AlreadyDispensed("Pharmacy order"));
    }
    tracing::info!(pharmacy_order_id = id, "Pharmacy order dispensed");
    get_pharmacy_order(conn, id)
}

pub fn list_prescriptions(
    conn: &Connection,
    dispensed: Option<bool>,
) -> Result<Vec<Prescription>, DispensaryError> {
    Ok(db::list_prescriptions(conn, dispensed)?)
}

pub fn get_prescription(conn: &Connection, id: i64) -> Result<Prescription, DispensaryError> {
    db::get_prescription(conn, id)?.ok_or(DispensaryError::NotFound("Prescription"))
}

pub fn dispense_prescription(conn: &Connection, id: i64) -> Result<Prescription, DispensaryError> {
    get_prescription(conn, id)?;
    if !db::mark_prescription_dispensed(conn, id)? {
        return Err(DispensaryError::AlreadyDispensed("Prescription"));
    }
    tracing::info!(prescription_id = id, "Prescription dispensed");
    get_prescription(conn, id)
}
