//! Line-item parsing, order totals and billing charges.
//!
//! Lab tests and pharmacy items arrive as loosely typed JSON: prices and
//! quantities may be numbers or numeric strings. They are normalised here
//! before anything is stored, so the totals and the persisted order agree.

use rusqlite::Connection;
use serde_json::{Map, Value};

use crate::db::{self, DatabaseError};
use crate::models::*;
use crate::validation::FieldErrors;

/// Extract a non-negative price. Absent or null means 0.
fn parse_price(value: Option<&Value>) -> Result<f64, String> {
    let price = match value {
        None | Some(Value::Null) => return Ok(0.0),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match price {
        Some(p) if p.is_finite() && p >= 0.0 => Ok(p),
        Some(_) => Err("price must not be negative.".into()),
        None => Err("price must be a number.".into()),
    }
}

/// Extract a positive whole quantity. Absent or null means 1.
fn parse_qty(value: Option<&Value>) -> Result<u32, String> {
    let qty = match value {
        None | Some(Value::Null) => return Ok(1),
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };
    match qty.map(u32::try_from) {
        Some(Ok(q)) if q > 0 => Ok(q),
        Some(_) => Err("qty must be a positive integer.".into()),
        None => Err("qty must be an integer.".into()),
    }
}

fn required_name(entry: &Map<String, Value>, key: &str) -> Result<String, String> {
    match entry.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(format!("{key} is required.")),
    }
}

/// Walk a JSON list of objects, collecting per-entry errors under `field`.
/// A missing list is treated as empty.
fn parse_entries<T>(
    field: &str,
    value: Option<&Value>,
    parse: impl Fn(Map<String, Value>) -> Result<T, String>,
) -> Result<Vec<T>, FieldErrors> {
    let entries = match value {
        Some(Value::Array(entries)) => entries,
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(_) => return Err(FieldErrors::single(field, "Expected a list of items.")),
    };

    let mut errors = FieldErrors::new();
    let mut parsed = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let result = match entry {
            Value::Object(map) => parse(map.clone()),
            _ => Err("Expected an object.".to_string()),
        };
        match result {
            Ok(item) => parsed.push(item),
            Err(message) => errors.add(field, format!("Item {index}: {message}")),
        }
    }
    errors.into_result().map(|_| parsed)
}

/// Parse `tests` from a lab order payload.
pub fn parse_lab_tests(value: Option<&Value>) -> Result<Vec<LabTest>, FieldErrors> {
    parse_entries("tests", value, |mut entry| {
        let test = required_name(&entry, "test")?;
        let price = parse_price(entry.get("price"))?;
        entry.remove("test");
        entry.remove("price");
        Ok(LabTest { test, price, extra: entry })
    })
}

/// Parse `items` from a pharmacy order payload.
pub fn parse_pharmacy_items(value: Option<&Value>) -> Result<Vec<PharmacyItem>, FieldErrors> {
    parse_entries("items", value, |mut entry| {
        let name = required_name(&entry, "name")?;
        let qty = parse_qty(entry.get("qty"))?;
        let price = parse_price(entry.get("price"))?;
        entry.remove("name");
        entry.remove("qty");
        entry.remove("price");
        Ok(PharmacyItem { name, qty, price, extra: entry })
    })
}

/// Finite prices can still overflow once summed or multiplied.
fn finite_total(field: &str, total: f64) -> Result<f64, FieldErrors> {
    if total.is_finite() {
        Ok(total)
    } else {
        Err(FieldErrors::single(field, "Order total is too large."))
    }
}

pub fn lab_total(tests: &[LabTest]) -> Result<f64, FieldErrors> {
    finite_total("tests", tests.iter().map(|t| t.price).sum())
}

pub fn pharmacy_total(items: &[PharmacyItem]) -> Result<f64, FieldErrors> {
    finite_total("items", items.iter().map(|i| i.price * f64::from(i.qty)).sum())
}

/// Record a charge for `appointment`'s patient when `amount` is positive.
///
/// Call with the transaction that created the order.
pub fn record_charge(
    conn: &Connection,
    bill_type: BillType,
    appointment: &Appointment,
    amount: f64,
    additional_info: &Value,
) -> Result<Option<BillingRecord>, DatabaseError> {
    if amount <= 0.0 {
        return Ok(None);
    }
    let record = db::insert_billing_record(
        conn,
        bill_type,
        &appointment.patient_name,
        amount,
        additional_info,
    )?;
    tracing::info!(
        billing_id = record.id,
        bill_type = %bill_type,
        amount,
        appointment_id = appointment.id,
        "Billing record created"
    );
    Ok(Some(record))
}

pub fn list_billing_records(
    conn: &Connection,
    bill_type: Option<BillType>,
) -> Result<Vec<BillingRecord>, DatabaseError> {
    db::list_billing_records(conn, bill_type)
}

pub fn get_billing_record(conn: &Connection, id: i64) -> Result<BillingRecord, DatabaseError> {
    db::get_billing_record(conn, id)?.ok_or_else(|| DatabaseError::not_found("BillingRecord", id))
}
