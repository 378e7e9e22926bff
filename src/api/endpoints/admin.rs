//! Admin panel endpoints (superuser only).
//!
//! Departments and employees are full CRUD; accounts and billing records
//! are read-only. Account generation is the only way to create a login.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{optional_json, ApiContext, ApiJson};
use crate::billing;
use crate::models::{AccountInfo, BillType, BillingRecord, Department, EmployeeRecord};
use crate::staff::{
    self, DepartmentInput, EmployeeInput, GenerateAccountInput, WriteMode,
};
use crate::validation::{parse_choice, FieldErrors};

// ─── Departments ──────────────────────────────────────────────────────────────

/// `GET /api/admin-panel/departments/`
pub async fn list_departments(
    State(ctx): State<ApiContext>,
) -> Result<Json<Vec<Department>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(crate::db::list_departments(&conn)?))
}

/// `POST /api/admin-panel/departments/`
pub async fn create_department(
    State(ctx): State<ApiContext>,
    ApiJson(input): ApiJson<DepartmentInput>,
) -> Result<(StatusCode, Json<Department>), ApiError> {
    let conn = ctx.core.open_db()?;
    let dept = staff::create_department(&conn, &input)?;
    Ok((StatusCode::CREATED, Json(dept)))
}

/// `GET /api/admin-panel/departments/:id/`
pub async fn get_department(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<Department>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(staff::get_department(&conn, id)?))
}

/// `PUT /api/admin-panel/departments/:id/`
pub async fn replace_department(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    ApiJson(input): ApiJson<DepartmentInput>,
) -> Result<Json<Department>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(staff::update_department(&conn, id, &input, WriteMode::Full)?))
}

/// `PATCH /api/admin-panel/departments/:id/`
pub async fn patch_department(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    ApiJson(input): ApiJson<DepartmentInput>,
) -> Result<Json<Department>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(staff::update_department(&conn, id, &input, WriteMode::Partial)?))
}

/// `DELETE /api/admin-panel/departments/:id/`
pub async fn delete_department(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let conn = ctx.core.open_db()?;
    staff::delete_department(&conn, id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Employees ────────────────────────────────────────────────────────────────

/// `GET /api/admin-panel/employees/`
pub async fn list_employees(
    State(ctx): State<ApiContext>,
) -> Result<Json<Vec<EmployeeRecord>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(staff::list_employees(&conn)?))
}

/// `POST /api/admin-panel/employees/`
pub async fn create_employee(
    State(ctx): State<ApiContext>,
    ApiJson(input): ApiJson<EmployeeInput>,
) -> Result<(StatusCode, Json<EmployeeRecord>), ApiError> {
    let conn = ctx.core.open_db()?;
    let record = staff::create_employee(&conn, &input)?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// `GET /api/admin-panel/employees/:id/`
pub async fn get_employee(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<EmployeeRecord>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(staff::get_employee(&conn, id)?))
}

/// `PUT /api/admin-panel/employees/:id/`
pub async fn replace_employee(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    ApiJson(input): ApiJson<EmployeeInput>,
) -> Result<Json<EmployeeRecord>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(staff::update_employee(&conn, id, &input, WriteMode::Full)?))
}

/// `PATCH /api/admin-panel/employees/:id/`
pub async fn patch_employee(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    ApiJson(input): ApiJson<EmployeeInput>,
) -> Result<Json<EmployeeRecord>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(staff::update_employee(&conn, id, &input, WriteMode::Partial)?))
}

/// `DELETE /api/admin-panel/employees/:id/`: also deletes the linked account
/// and revokes its tokens.
pub async fn delete_employee(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let mut conn = ctx.core.open_db()?;
    if let Some(account_id) = staff::delete_employee(&mut conn, id)? {
        ctx.lock_tokens()?.revoke_account(account_id);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/admin-panel/employees/by-role/:role/`
pub async fn employees_by_role(
    State(ctx): State<ApiContext>,
    Path(role): Path<String>,
) -> Result<Json<Vec<EmployeeRecord>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(staff::list_employees_by_role(&conn, &role)?))
}

#[derive(Serialize)]
pub struct GeneratedCredentials {
    pub username: String,
    pub password: String,
}

/// `POST /api/admin-panel/employees/:id/generate-account/`
///
/// Body is optional: `{"username": "...", "send_email": false}`. The
/// plaintext password appears in this response only.
pub async fn generate_account(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<(StatusCode, Json<GeneratedCredentials>), ApiError> {
    let input: GenerateAccountInput = optional_json(&body)?;
    let core = ctx.core.clone();
    let generated = tokio::task::spawn_blocking(move || -> Result<_, ApiError> {
        let mut conn = core.open_db()?;
        Ok(staff::generate_account(&mut conn, id, &input)?)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("account generation task: {e}")))??;

    Ok((
        StatusCode::CREATED,
        Json(GeneratedCredentials {
            username: generated.account.username.clone(),
            password: generated.password.to_string(),
        }),
    ))
}

// ─── Accounts ─────────────────────────────────────────────────────────────────

/// `GET /api/admin-panel/accounts/`
pub async fn list_accounts(
    State(ctx): State<ApiContext>,
) -> Result<Json<Vec<AccountInfo>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(staff::list_accounts(&conn)?))
}

/// `GET /api/admin-panel/accounts/:id/`
pub async fn get_account(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<AccountInfo>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(staff::get_account(&conn, id)?))
}

// ─── Billing ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct BillingQuery {
    pub bill_type: Option<String>,
}

/// `GET /api/admin-panel/billing/`: newest first, optional `?bill_type=LAB|PHARMACY`.
pub async fn list_billing(
    State(ctx): State<ApiContext>,
    Query(query): Query<BillingQuery>,
) -> Result<Json<Vec<BillingRecord>>, ApiError> {
    let bill_type = match query.bill_type.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            let mut errors = FieldErrors::new();
            let parsed: Option<BillType> = parse_choice(&mut errors, "bill_type", raw);
            errors.into_result()?;
            parsed
        }
    };
    let conn = ctx.core.open_db()?;
    Ok(Json(billing::list_billing_records(&conn, bill_type)?))
}

/// `GET /api/admin-panel/billing/:id/`
pub async fn get_billing(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<BillingRecord>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(billing::get_billing_record(&conn, id)?))
}
