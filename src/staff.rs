//! Staff administration: departments, employees and their login accounts.
//!
//! Rules enforced here:
//! - a doctor must belong to a department, on create and on every update;
//! - an employee gets at most one account, created and linked atomically;
//! - deleting an employee deletes its account in the same transaction.

use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::crypto;
use crate::db::{self, DatabaseError};
use crate::models::*;
use crate::validation::{double_option, max_length, parse_age, parse_choice, required_text, FieldErrors};

const NAME_MAX: usize = 120;
const PHONE_MAX: usize = 30;
const USERNAME_MAX: usize = 150;

#[derive(Debug, thiserror::Error)]
pub enum StaffError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),
    #[error("Account already exists for this employee.")]
    AccountExists { username: String },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<FieldErrors> for StaffError {
    fn from(errors: FieldErrors) -> Self {
        StaffError::Validation(errors)
    }
}

// ─── Departments ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepartmentInput {
    pub name: Option<String>,
}

fn department_name(input: &DepartmentInput) -> Result<String, FieldErrors> {
    let mut errors = FieldErrors::new();
    let name = required_text(&mut errors, "name", input.name.as_deref());
    max_length(&mut errors, "name", &name, NAME_MAX);
    errors.into_result().map(|_| name)
}

fn duplicate_department(err: DatabaseError) -> StaffError {
    if err.is_unique_violation() {
        FieldErrors::single("name", "department with this name already exists.").into()
    } else {
        err.into()
    }
}

pub fn get_department(conn: &Connection, id: i64) -> Result<Department, StaffError> {
    db::get_department(conn, id)?.ok_or(StaffError::NotFound("Department"))
}

pub fn create_department(conn: &Connection, input: &DepartmentInput) -> Result<Department, StaffError> {
    let name = department_name(input)?;
    let dept = db::insert_department(conn, &name).map_err(duplicate_department)?;
    tracing::info!(department_id = dept.id, name = %dept.name, "Department created");
    Ok(dept)
}

/// PUT requires `name`; PATCH keeps the stored name when it is omitted.
pub fn update_department(
    conn: &Connection,
    id: i64,
    input: &DepartmentInput,
    mode: WriteMode,
) -> Result<Department, StaffError> {
    let current = get_department(conn, id)?;
    if mode == WriteMode::Partial && input.name.is_none() {
        return Ok(current);
    }
    let name = department_name(input)?;
    db::rename_department(conn, id, &name).map_err(duplicate_department)
}

pub fn delete_department(conn: &Connection, id: i64) -> Result<(), StaffError> {
    get_department(conn, id)?;
    db::delete_department(conn, id)?;
    tracing::info!(department_id = id, "Department deleted");
    Ok(())
}

// ─── Employees ────────────────────────────────────────────────────────────────

/// Employee payload. Every field is optional so the same shape serves
/// create, full update and partial update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeeInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub age: Option<Option<i64>>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub department_id: Option<Option<i64>>,
}

/// How an update payload applies to the stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Missing fields fall back to their defaults; required fields must be present.
    Full,
    /// Missing fields keep their current value.
    Partial,
}

fn resolve_employee_fields(
    conn: &Connection,
    current: Option<&Employee>,
    input: &EmployeeInput,
    mode: WriteMode,
) -> Result<EmployeeFields, StaffError> {
    let mut errors = FieldErrors::new();
    let base = current.filter(|_| mode == WriteMode::Partial);

    let first_name = match (&input.first_name, base) {
        (None, Some(cur)) => cur.first_name.clone(),
        (value, _) => required_text(&mut errors, "first_name", value.as_deref()),
    };
    max_length(&mut errors, "first_name", &first_name, NAME_MAX);

    let last_name = match (&input.last_name, base) {
        (Some(v), _) => v.trim().to_string(),
        (None, Some(cur)) => cur.last_name.clone(),
        (None, None) => String::new(),
    };
    max_length(&mut errors, "last_name", &last_name, NAME_MAX);

    let age = match (input.age, base) {
        (Some(Some(v)), _) => parse_age(&mut errors, "age", v),
        (Some(None), _) => None,
        (None, Some(cur)) => cur.age,
        (None, None) => None,
    };

    let gender = match (&input.gender, base) {
        (Some(v), _) => parse_choice(&mut errors, "gender", v).unwrap_or_default(),
        (None, Some(cur)) => cur.gender,
        (None, None) => Gender::default(),
    };

    let phone = match (&input.phone, base) {
        (Some(v), _) => v.trim().to_string(),
        (None, Some(cur)) => cur.phone.clone(),
        (None, None) => String::new(),
    };
    max_length(&mut errors, "phone", &phone, PHONE_MAX);

    let role = match (&input.role, base) {
        (Some(v), _) => parse_choice::<Role>(&mut errors, "role", v),
        (None, Some(cur)) => Some(cur.role),
        (None, None) => {
            errors.add("role", "This field is required.");
            None
        }
    };

    let department_id = match (input.department_id, base) {
        (Some(Some(id)), _) => {
            if db::get_department(conn, id)?.is_none() {
                errors.add(
                    "department_id",
                    format!("Invalid pk \"{id}\" - object does not exist."),
                );
            }
            Some(id)
        }
        (Some(None), _) => None,
        (None, Some(cur)) => cur.department_id,
        (None, None) => None,
    };

    if role == Some(Role::Doctor) && department_id.is_none() {
        errors.add("department_id", "Doctor must have a department.");
    }

    errors.into_result()?;
    Ok(EmployeeFields {
        first_name,
        last_name,
        age,
        gender,
        phone,
        // Unreachable as None: a missing role recorded an error above.
        role: role.unwrap_or(Role::Receptionist),
        department_id,
    })
}

pub fn get_employee(conn: &Connection, id: i64) -> Result<EmployeeRecord, StaffError> {
    db::get_employee_record(conn, id)?.ok_or(StaffError::NotFound("Employee"))
}

pub fn list_employees(conn: &Connection) -> Result<Vec<EmployeeRecord>, StaffError> {
    Ok(db::list_employee_records(conn, None)?)
}

/// Employees holding `role`, given in its wire form (`"doctor"`, `"lab_technician"`, ...).
pub fn list_employees_by_role(conn: &Connection, role: &str) -> Result<Vec<EmployeeRecord>, StaffError> {
    let mut errors = FieldErrors::new();
    let role: Option<Role> = parse_choice(&mut errors, "role", role);
    errors.into_result()?;
    Ok(db::list_employee_records(conn, role)?)
}

pub fn create_employee(conn: &Connection, input: &EmployeeInput) -> Result<EmployeeRecord, StaffError> {
    let fields = resolve_employee_fields(conn, None, input, WriteMode::Full)?;
    let employee = db::insert_employee(conn, &fields)?;
    tracing::info!(employee_id = employee.id, role = %employee.role, "Employee created");
    get_employee(conn, employee.id)
}

pub fn update_employee(
    conn: &Connection,
    id: i64,
    input: &EmployeeInput,
    mode: WriteMode,
) -> Result<EmployeeRecord, StaffError> {
    let current = get_employee(conn, id)?;
    let fields = resolve_employee_fields(conn, Some(&current.employee), input, mode)?;
    db::update_employee(conn, id, &fields)?;
    tracing::info!(employee_id = id, role = %fields.role, "Employee updated");
    get_employee(conn, id)
}

/// Delete an employee together with its linked account.
///
/// Returns the id of the deleted account, if there was one, so callers can
/// revoke any credentials issued for it.
pub fn delete_employee(conn: &mut Connection, id: i64) -> Result<Option<i64>, StaffError> {
    let tx = conn.transaction().map_err(DatabaseError::from)?;
    let employee = db::get_employee(&tx, id)?.ok_or(StaffError::NotFound("Employee"))?;
    if let Some(account_id) = employee.account_id {
        db::delete_account(&tx, account_id)?;
    }
    db::delete_employee(&tx, id)?;
    tx.commit().map_err(DatabaseError::from)?;

    tracing::info!(employee_id = id, account_id = ?employee.account_id, "Employee deleted");
    Ok(employee.account_id)
}

// ─── Accounts ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateAccountInput {
    /// Explicit username; derived from the employee when absent or blank.
    pub username: Option<String>,
    /// Accepted for compatibility; no mail is sent.
    #[serde(default)]
    pub send_email: bool,
}

/// A freshly created account plus its one-time plaintext password.
pub struct GeneratedAccount {
    pub account: Account,
    pub password: Zeroizing<String>,
}

/// `role[..3] + "_" + id + "_" + first initial + last name`, e.g. `doc_5_jsmith`.
pub fn derive_username(employee: &Employee) -> String {
    let initial: String = employee.first_name.chars().take(1).collect();
    let mut base: String = format!("{initial}{}", employee.last_name)
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    if base.is_empty() {
        base = "user".to_string();
    }
    let prefix: String = employee.role.as_str().chars().take(3).collect();
    format!("{prefix}_{}_{base}", employee.id)
}

/// First of `candidate`, `candidate1`, `candidate2`, ... not already taken.
pub fn unique_username(conn: &Connection, candidate: &str) -> Result<String, DatabaseError> {
    let mut username = candidate.to_string();
    let mut suffix = 0u32;
    while db::username_exists(conn, &username)? {
        suffix += 1;
        username = format!("{candidate}{suffix}");
    }
    Ok(username)
}

fn requested_username(input: &GenerateAccountInput) -> Result<Option<String>, FieldErrors> {
    let Some(username) = input.username.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
        return Ok(None);
    };
    let mut errors = FieldErrors::new();
    max_length(&mut errors, "username", username, USERNAME_MAX);
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
    {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
    errors.into_result().map(|_| Some(username.to_string()))
}

/// Create a login account for an employee and link it.
///
/// Fails with `AccountExists` (leaving everything untouched) when the
/// employee already has one.
pub fn generate_account(
    conn: &mut Connection,
    employee_id: i64,
    input: &GenerateAccountInput,
) -> Result<GeneratedAccount, StaffError> {
    let requested = requested_username(input)?;
    let password = crypto::generate_password(crypto::GENERATED_PASSWORD_LENGTH);
    let password_hash = crypto::hash_password(&password);

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(DatabaseError::from)?;

    let record = db::get_employee_record(&tx, employee_id)?.ok_or(StaffError::NotFound("Employee"))?;
    if let Some(username) = record.username {
        return Err(StaffError::AccountExists { username });
    }

    let candidate = requested.unwrap_or_else(|| derive_username(&record.employee));
    let username = unique_username(&tx, &candidate)?;
    let account = db::insert_account(&tx, &username, &password_hash, false)?;
    db::link_account(&tx, employee_id, account.id)?;
    tx.commit().map_err(DatabaseError::from)?;

    if input.send_email {
        tracing::debug!(employee_id, "Email delivery is not configured; credentials returned inline");
    }
    tracing::info!(employee_id, account_id = account.id, username = %account.username, "Account generated");
    Ok(GeneratedAccount { account, password })
}

pub fn list_accounts(conn: &Connection) -> Result<Vec<AccountInfo>, StaffError> {
    Ok(db::list_account_infos(conn)?)
}

pub fn get_account(conn: &Connection, id: i64) -> Result<AccountInfo, StaffError> {
    db::get_account_info(conn, id)?.ok_or(StaffError::NotFound("Account"))
}

/// Create the superuser account if no account with `username` exists.
/// Returns true when an account was created.
pub fn ensure_superuser(conn: &Connection, username: &str, password: &str) -> Result<bool, StaffError> {
    if db::username_exists(conn, username)? {
        return Ok(false);
    }
    let hash = crypto::hash_password(password);
    let account = db::insert_account(conn, username, &hash, true)?;
    tracing::info!(account_id = account.id, username, "Superuser created");
    Ok(true)
}
