use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;

use super::json_column;
use crate::db::DatabaseError;
use crate::models::*;

const BILLING_COLUMNS: &str = "id, bill_type, patient_name, amount, additional_info, created_at";

fn billing_from_row(row: &Row<'_>) -> rusqlite::Result<BillingRecord> {
    Ok(BillingRecord {
        id: row.get(0)?,
        bill_type: row.get(1)?,
        patient_name: row.get(2)?,
        amount: row.get(3)?,
        additional_info: json_column(row, 4)?,
        created_at: row.get(5)?,
    })
}

pub fn insert_billing_record(
    conn: &Connection,
    bill_type: BillType,
    patient_name: &str,
    amount: f64,
    additional_info: &Value,
) -> Result<BillingRecord, DatabaseError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO billing_records (bill_type, patient_name, amount, additional_info, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            bill_type,
            patient_name,
            amount,
            serde_json::to_string(additional_info)?,
            now,
        ],
    )?;
    Ok(BillingRecord {
        id: conn.last_insert_rowid(),
        bill_type,
        patient_name: patient_name.to_string(),
        amount,
        additional_info: additional_info.clone(),
        created_at: now,
    })
}

pub fn get_billing_record(conn: &Connection, id: i64) -> Result<Option<BillingRecord>, DatabaseError> {
    let record = conn
        .query_row(
            &format!("SELECT {BILLING_COLUMNS} FROM billing_records WHERE id = ?1"),
            params![id],
            billing_from_row,
        )
        .optional()?;
    Ok(record)
}

/// Billing records newest first, optionally of a single type.
pub fn list_billing_records(
    conn: &Connection,
    bill_type: Option<BillType>,
) -> Result<Vec<BillingRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BILLING_COLUMNS} FROM billing_records
         WHERE (?1 IS NULL OR bill_type = ?1)
         ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map(params![bill_type], billing_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use serde_json::json;

    #[test]
    fn insert_and_filter_by_type() {
        let conn = open_memory_database().unwrap();
        let info = json!({"lab_order_id": 1, "appointment_id": 7});
        let lab = insert_billing_record(&conn, BillType::Lab, "Amy Pond", 150.0, &info).unwrap();
        insert_billing_record(&conn, BillType::Pharmacy, "Amy Pond", 40.0, &json!({})).unwrap();

        let loaded = get_billing_record(&conn, lab.id).unwrap().unwrap();
        assert_eq!(loaded.additional_info, info);
        assert_eq!(loaded.amount, 150.0);

        assert_eq!(list_billing_records(&conn, None).unwrap().len(), 2);
        let pharmacy = list_billing_records(&conn, Some(BillType::Pharmacy)).unwrap();
        assert_eq!(pharmacy.len(), 1);
        assert_eq!(pharmacy[0].amount, 40.0);
    }
}
