use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::models::*;

const ACCOUNT_COLUMNS: &str =
    "id, username, password_hash, email, is_active, is_superuser, date_joined";

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        email: row.get(3)?,
        is_active: row.get(4)?,
        is_superuser: row.get(5)?,
        date_joined: row.get(6)?,
    })
}

pub fn insert_account(
    conn: &Connection,
    username: &str,
    password_hash: &str,
    is_superuser: bool,
) -> Result<Account, DatabaseError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO accounts (username, password_hash, is_active, is_superuser, date_joined)
         VALUES (?1, ?2, 1, ?3, ?4)",
        params![username, password_hash, is_superuser, now],
    )?;
    Ok(Account {
        id: conn.last_insert_rowid(),
        username: username.to_string(),
        password_hash: password_hash.to_string(),
        email: None,
        is_active: true,
        is_superuser,
        date_joined: now,
    })
}

pub fn get_account(conn: &Connection, id: i64) -> Result<Option<Account>, DatabaseError> {
    let account = conn
        .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
            params![id],
            account_from_row,
        )
        .optional()?;
    Ok(account)
}

pub fn get_account_by_username(
    conn: &Connection,
    username: &str,
) -> Result<Option<Account>, DatabaseError> {
    let account = conn
        .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = ?1"),
            params![username],
            account_from_row,
        )
        .optional()?;
    Ok(account)
}

pub fn username_exists(conn: &Connection, username: &str) -> Result<bool, DatabaseError> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM accounts WHERE username = ?1)",
        params![username],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn delete_account(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM accounts WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("Account", id));
    }
    Ok(())
}

fn account_info_from_row(row: &Row<'_>) -> rusqlite::Result<AccountInfo> {
    let first: Option<String> = row.get(5)?;
    let last: Option<String> = row.get(6)?;
    let role: Option<Role> = row.get(7)?;
    let employee_name = match (first, role) {
        (Some(first), Some(role)) => {
            let name = format!("{} {}", first, last.unwrap_or_default());
            Some(format!("{} ({})", name.trim(), role.display_name()))
        }
        _ => None,
    };
    Ok(AccountInfo {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        is_active: row.get(3)?,
        date_joined: row.get(4)?,
        employee_name,
        role,
    })
}

const ACCOUNT_INFO_SELECT: &str =
    "SELECT a.id, a.username, a.email, a.is_active, a.date_joined,
            e.first_name, e.last_name, e.role
     FROM accounts a
     LEFT JOIN employees e ON e.account_id = a.id";

pub fn list_account_infos(conn: &Connection) -> Result<Vec<AccountInfo>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{ACCOUNT_INFO_SELECT} ORDER BY a.id"))?;
    let rows = stmt.query_map([], account_info_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn get_account_info(conn: &Connection, id: i64) -> Result<Option<AccountInfo>, DatabaseError> {
    let info = conn
        .query_row(
            &format!("{ACCOUNT_INFO_SELECT} WHERE a.id = ?1"),
            params![id],
            account_info_from_row,
        )
        .optional()?;
    Ok(info)
}
