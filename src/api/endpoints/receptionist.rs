//! Receptionist endpoints: patients, appointment booking, doctor lookup.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson};
use crate::front_desk::{self, AppointmentInput, PatientInput};
use crate::models::{Appointment, AppointmentFilter, AppointmentStatus, EmployeeRecord, Patient};
use crate::validation::{parse_choice, FieldErrors};

#[derive(Deserialize)]
pub struct PatientQuery {
    pub search: Option<String>,
}

/// `GET /api/receptionist/patients/?search=`
pub async fn list_patients(
    State(ctx): State<ApiContext>,
    Query(query): Query<PatientQuery>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(front_desk::list_patients(&conn, query.search.as_deref())?))
}

/// `POST /api/receptionist/patients/`
pub async fn create_patient(
    State(ctx): State<ApiContext>,
    ApiJson(input): ApiJson<PatientInput>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let conn = ctx.core.open_db()?;
    let patient = front_desk::create_patient(&conn, &input)?;
    Ok((StatusCode::CREATED, Json(patient)))
}

/// `GET /api/receptionist/patients/:id/`
pub async fn get_patient(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<Patient>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(front_desk::get_patient(&conn, id)?))
}

/// `PATCH /api/receptionist/patients/:id/`
pub async fn update_patient(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    ApiJson(input): ApiJson<PatientInput>,
) -> Result<Json<Patient>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(front_desk::update_patient(&conn, id, &input)?))
}

#[derive(Deserialize)]
pub struct AppointmentQuery {
    pub status: Option<String>,
    pub doctor_id: Option<i64>,
    pub patient_id: Option<i64>,
}

/// `GET /api/receptionist/appointments/?status=&doctor_id=&patient_id=`
pub async fn list_appointments(
    State(ctx): State<ApiContext>,
    Query(query): Query<AppointmentQuery>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            let mut errors = FieldErrors::new();
            let parsed: Option<AppointmentStatus> = parse_choice(&mut errors, "status", raw);
            errors.into_result()?;
            parsed
        }
    };
    let filter = AppointmentFilter {
        doctor_id: query.doctor_id,
        patient_id: query.patient_id,
        status,
    };
    let conn = ctx.core.open_db()?;
    Ok(Json(front_desk::list_appointments(&conn, &filter)?))
}

/// `POST /api/receptionist/appointments/`
pub async fn create_appointment(
    State(ctx): State<ApiContext>,
    ApiJson(input): ApiJson<AppointmentInput>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let conn = ctx.core.open_db()?;
    let appt = front_desk::create_appointment(&conn, &input)?;
    Ok((StatusCode::CREATED, Json(appt)))
}

/// `GET /api/receptionist/appointments/:id/`
pub async fn get_appointment(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<Appointment>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(front_desk::get_appointment(&conn, id)?))
}

/// `PATCH /api/receptionist/appointments/:id/`
pub async fn update_appointment(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    ApiJson(input): ApiJson<AppointmentInput>,
) -> Result<Json<Appointment>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(front_desk::update_appointment(&conn, id, &input)?))
}

/// `POST /api/receptionist/appointments/:id/cancel/`
pub async fn cancel_appointment(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<Appointment>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(front_desk::cancel_appointment(&conn, id)?))
}

/// `GET /api/receptionist/doctors/`
pub async fn list_doctors(
    State(ctx): State<ApiContext>,
) -> Result<Json<Vec<EmployeeRecord>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(front_desk::list_doctors(&conn)?))
}
