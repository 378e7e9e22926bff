use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::models::*;

const EMPLOYEE_SELECT: &str =
    "SELECT e.id, e.first_name, e.last_name, e.age, e.gender, e.phone, e.role,
            e.department_id, e.account_id, e.created_at, e.updated_at,
            d.name, a.username
     FROM employees e
     LEFT JOIN departments d ON d.id = e.department_id
     LEFT JOIN accounts a ON a.id = e.account_id";

const EMPLOYEE_ORDER: &str = "ORDER BY e.role, e.last_name, e.first_name";

fn employee_from_row(row: &Row<'_>) -> rusqlite::Result<Employee> {
    Ok(Employee {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        age: row.get(3)?,
        gender: row.get(4)?,
        phone: row.get(5)?,
        role: row.get(6)?,
        department_id: row.get(7)?,
        account_id: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<EmployeeRecord> {
    Ok(EmployeeRecord {
        employee: employee_from_row(row)?,
        department: match (row.get::<_, Option<i64>>(7)?, row.get::<_, Option<String>>(11)?) {
            (Some(id), Some(name)) => Some(Department { id, name }),
            _ => None,
        },
        username: row.get(12)?,
    })
}

pub fn insert_employee(conn: &Connection, fields: &EmployeeFields) -> Result<Employee, DatabaseError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO employees (first_name, last_name, age, gender, phone, role, department_id,
                                created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            fields.first_name,
            fields.last_name,
            fields.age,
            fields.gender,
            fields.phone,
            fields.role,
            fields.department_id,
            now,
        ],
    )?;
    Ok(Employee {
        id: conn.last_insert_rowid(),
        first_name: fields.first_name.clone(),
        last_name: fields.last_name.clone(),
        age: fields.age,
        gender: fields.gender,
        phone: fields.phone.clone(),
        role: fields.role,
        department_id: fields.department_id,
        account_id: None,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_employee(conn: &Connection, id: i64) -> Result<Option<Employee>, DatabaseError> {
    Ok(get_employee_record(conn, id)?.map(|r| r.employee))
}

pub fn get_employee_record(
    conn: &Connection,
    id: i64,
) -> Result<Option<EmployeeRecord>, DatabaseError> {
    let record = conn
        .query_row(
            &format!("{EMPLOYEE_SELECT} WHERE e.id = ?1"),
            params![id],
            record_from_row,
        )
        .optional()?;
    Ok(record)
}

/// Staff profile linked to a login account, if any.
pub fn get_employee_by_account(
    conn: &Connection,
    account_id: i64,
) -> Result<Option<Employee>, DatabaseError> {
    let employee = conn
        .query_row(
            &format!("{EMPLOYEE_SELECT} WHERE e.account_id = ?1"),
            params![account_id],
            employee_from_row,
        )
        .optional()?;
    Ok(employee)
}

/// All employees, or only those holding `role`.
pub fn list_employee_records(
    conn: &Connection,
    role: Option<Role>,
) -> Result<Vec<EmployeeRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{EMPLOYEE_SELECT} WHERE (?1 IS NULL OR e.role = ?1) {EMPLOYEE_ORDER}"
    ))?;
    let rows = stmt.query_map(params![role], record_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn update_employee(
    conn: &Connection,
    id: i64,
    fields: &EmployeeFields,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE employees
         SET first_name = ?1, last_name = ?2, age = ?3, gender = ?4, phone = ?5,
             role = ?6, department_id = ?7, updated_at = ?8
         WHERE id = ?9",
        params![
            fields.first_name,
            fields.last_name,
            fields.age,
            fields.gender,
            fields.phone,
            fields.role,
            fields.department_id,
            Utc::now(),
            id,
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("Employee", id));
    }
    Ok(())
}

pub fn link_account(conn: &Connection, employee_id: i64, account_id: i64) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE employees SET account_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![account_id, Utc::now(), employee_id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("Employee", employee_id));
    }
    Ok(())
}

pub fn delete_employee(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM employees WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("Employee", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{doctor_fields, make_doctor};
    use crate::db::{insert_account, insert_department, open_memory_database};

    fn receptionist(last: &str) -> EmployeeFields {
        EmployeeFields {
            first_name: "Rita".into(),
            last_name: last.into(),
            age: None,
            gender: Gender::Female,
            phone: String::new(),
            role: Role::Receptionist,
            department_id: None,
        }
    }

    #[test]
    fn insert_and_read_back_with_department() {
        let conn = open_memory_database().unwrap();
        let doctor = make_doctor(&conn, "Jane", "Smith");
        let record = get_employee_record(&conn, doctor.id).unwrap().unwrap();
        assert_eq!(record.employee.role, Role::Doctor);
        assert_eq!(record.department.as_ref().map(|d| d.name.as_str()), Some("Cardiology"));
        assert!(record.username.is_none());
    }

    #[test]
    fn list_filters_by_role_and_orders() {
        let conn = open_memory_database().unwrap();
        make_doctor(&conn, "Jane", "Smith");
        insert_employee(&conn, &receptionist("Young")).unwrap();
        insert_employee(&conn, &receptionist("Adams")).unwrap();

        let all = list_employee_records(&conn, None).unwrap();
        assert_eq!(all.len(), 3);
        // "doctor" sorts before "receptionist"
        assert_eq!(all[0].employee.role, Role::Doctor);
        assert_eq!(all[1].employee.last_name, "Adams");

        let receptionists = list_employee_records(&conn, Some(Role::Receptionist)).unwrap();
        assert_eq!(receptionists.len(), 2);
        assert!(list_employee_records(&conn, Some(Role::Pharmacist)).unwrap().is_empty());
    }

    #[test]
    fn link_account_exposes_username() {
        let conn = open_memory_database().unwrap();
        let doctor = make_doctor(&conn, "Jane", "Smith");
        let account = insert_account(&conn, "doc_1_jsmith", "hash", false).unwrap();
        link_account(&conn, doctor.id, account.id).unwrap();

        let record = get_employee_record(&conn, doctor.id).unwrap().unwrap();
        assert_eq!(record.username.as_deref(), Some("doc_1_jsmith"));
        let by_account = get_employee_by_account(&conn, account.id).unwrap().unwrap();
        assert_eq!(by_account.id, doctor.id);
    }

    #[test]
    fn update_overwrites_fields() {
        let conn = open_memory_database().unwrap();
        let dept = insert_department(&conn, "Oncology").unwrap();
        let created = insert_employee(&conn, &receptionist("Young")).unwrap();
        let fields = doctor_fields(dept.id, "Rita", "Young");
        update_employee(&conn, created.id, &fields).unwrap();
        let reloaded = get_employee(&conn, created.id).unwrap().unwrap();
        assert_eq!(reloaded.role, Role::Doctor);
        assert_eq!(reloaded.department_id, Some(dept.id));
    }

    #[test]
    fn delete_employee_removes_row() {
        let conn = open_memory_database().unwrap();
        let doctor = make_doctor(&conn, "Jane", "Smith");
        delete_employee(&conn, doctor.id).unwrap();
        assert!(get_employee(&conn, doctor.id).unwrap().is_none());
        assert!(delete_employee(&conn, doctor.id).is_err());
    }
}
