use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

pub fn insert_department(conn: &Connection, name: &str) -> Result<Department, DatabaseError> {
    conn.execute("INSERT INTO departments (name) VALUES (?1)", params![name])?;
    Ok(Department {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
    })
}

pub fn get_department(conn: &Connection, id: i64) -> Result<Option<Department>, DatabaseError> {
    let dept = conn
        .query_row(
            "SELECT id, name FROM departments WHERE id = ?1",
            params![id],
            |row| Ok(Department { id: row.get(0)?, name: row.get(1)? }),
        )
        .optional()?;
    Ok(dept)
}

pub fn list_departments(conn: &Connection) -> Result<Vec<Department>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT id, name FROM departments ORDER BY name")?;
    let rows = stmt.query_map([], |row| {
        Ok(Department { id: row.get(0)?, name: row.get(1)? })
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn rename_department(conn: &Connection, id: i64, name: &str) -> Result<Department, DatabaseError> {
    let updated = conn.execute(
        "UPDATE departments SET name = ?1 WHERE id = ?2",
        params![name, id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("Department", id));
    }
    Ok(Department { id, name: name.to_string() })
}

pub fn delete_department(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM departments WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("Department", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    #[test]
    fn departments_list_by_name() {
        let conn = open_memory_database().unwrap();
        insert_department(&conn, "Radiology").unwrap();
        insert_department(&conn, "Cardiology").unwrap();
        let names: Vec<String> = list_departments(&conn)
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["Cardiology", "Radiology"]);
    }

    #[test]
    fn duplicate_name_rejected() {
        let conn = open_memory_database().unwrap();
        insert_department(&conn, "Cardiology").unwrap();
        let err = insert_department(&conn, "Cardiology").unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn rename_and_delete() {
        let conn = open_memory_database().unwrap();
        let dept = insert_department(&conn, "ER").unwrap();
        let renamed = rename_department(&conn, dept.id, "Emergency").unwrap();
        assert_eq!(renamed.name, "Emergency");
        delete_department(&conn, dept.id).unwrap();
        assert!(get_department(&conn, dept.id).unwrap().is_none());
        assert!(matches!(
            delete_department(&conn, dept.id),
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[test]
    fn deleting_department_detaches_employees() {
        let conn = open_memory_database().unwrap();
        let doctor = crate::db::fixtures::make_doctor(&conn, "Ann", "Lee");
        let dept_id = doctor.department_id.unwrap();
        delete_department(&conn, dept_id).unwrap();
        let reloaded = crate::db::get_employee(&conn, doctor.id).unwrap().unwrap();
        assert!(reloaded.department_id.is_none());
    }
}
