//! Doctor endpoints. Every route operates on the caller's own appointments.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson};
use crate::authorization::Principal;
use crate::consultation::{self, LabOrderInput, PharmacyOrderInput, PrescriptionInput};
use crate::models::{
    Appointment, LabOrder, NewPrescriptionItem, PharmacyOrder, Prescription, PrescriptionItem,
};

/// The caller's employee id; superusers without a doctor profile are refused.
fn doctor_id(principal: &Principal) -> Result<i64, ApiError> {
    principal.doctor_id().ok_or(ApiError::Forbidden)
}

/// `GET /api/doctor/my-appointments/`
pub async fn my_appointments(
    State(ctx): State<ApiContext>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let doctor_id = doctor_id(&principal)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(consultation::my_appointments(&conn, doctor_id)?))
}

/// `GET /api/doctor/appointments/:id/`
pub async fn appointment_detail(
    State(ctx): State<ApiContext>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Appointment>, ApiError> {
    let doctor_id = doctor_id(&principal)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(consultation::appointment_detail(&conn, doctor_id, appointment_id)?))
}

/// `POST /api/doctor/appointments/:id/prescription/`
pub async fn create_prescription(
    State(ctx): State<ApiContext>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<i64>,
    ApiJson(input): ApiJson<PrescriptionInput>,
) -> Result<(StatusCode, Json<Prescription>), ApiError> {
    let doctor_id = doctor_id(&principal)?;
    let mut conn = ctx.core.open_db()?;
    let prescription =
        consultation::create_prescription(&mut conn, doctor_id, appointment_id, &input)?;
    Ok((StatusCode::CREATED, Json(prescription)))
}

/// `GET /api/doctor/appointments/:id/prescription/`
pub async fn get_prescription(
    State(ctx): State<ApiContext>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Prescription>, ApiError> {
    let doctor_id = doctor_id(&principal)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(consultation::get_prescription(&conn, doctor_id, appointment_id)?))
}

/// `POST /api/doctor/appointments/:id/prescription/add-item/`
pub async fn add_prescription_item(
    State(ctx): State<ApiContext>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<i64>,
    ApiJson(item): ApiJson<NewPrescriptionItem>,
) -> Result<(StatusCode, Json<PrescriptionItem>), ApiError> {
    let doctor_id = doctor_id(&principal)?;
    let conn = ctx.core.open_db()?;
    let saved = consultation::add_prescription_item(&conn, doctor_id, appointment_id, &item)?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// `POST /api/doctor/appointments/:id/lab-order/`
pub async fn create_lab_order(
    State(ctx): State<ApiContext>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<i64>,
    ApiJson(input): ApiJson<LabOrderInput>,
) -> Result<(StatusCode, Json<LabOrder>), ApiError> {
    let doctor_id = doctor_id(&principal)?;
    let mut conn = ctx.core.open_db()?;
    let order = consultation::create_lab_order(&mut conn, doctor_id, appointment_id, &input)?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// `POST /api/doctor/appointments/:id/pharmacy-order/`
pub async fn create_pharmacy_order(
    State(ctx): State<ApiContext>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<i64>,
    ApiJson(input): ApiJson<PharmacyOrderInput>,
) -> Result<(StatusCode, Json<PharmacyOrder>), ApiError> {
    let doctor_id = doctor_id(&principal)?;
    let mut conn = ctx.core.open_db()?;
    let order = consultation::create_pharmacy_order(&mut conn, doctor_id, appointment_id, &input)?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[derive(Serialize)]
pub struct DetailResponse {
    pub detail: &'static str,
}

/// `POST /api/doctor/appointments/:id/complete/`
pub async fn complete(
    State(ctx): State<ApiContext>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<DetailResponse>, ApiError> {
    let doctor_id = doctor_id(&principal)?;
    let conn = ctx.core.open_db()?;
    consultation::complete_appointment(&conn, doctor_id, appointment_id)?;
    Ok(Json(DetailResponse {
        detail: "Appointment marked completed",
    }))
}
