//! Pharmacist endpoints: dispensing pharmacy orders and prescriptions.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::endpoints::parse_flag;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::dispensary;
use crate::models::{PharmacyOrder, Prescription};

#[derive(Deserialize)]
pub struct DispensedQuery {
    pub dispensed: Option<String>,
}

/// `GET /api/pharmacist/orders/?dispensed=`
pub async fn list_orders(
    State(ctx): State<ApiContext>,
    Query(query): Query<DispensedQuery>,
) -> Result<Json<Vec<PharmacyOrder>>, ApiError> {
    let dispensed = parse_flag("dispensed", query.dispensed.as_deref())?;
    let conn = ctx.core.open_db()?;
    Ok(Json(dispensary::list_pharmacy_orders(&conn, dispensed)?))
}

/// `GET /api/pharmacist/orders/:id/`
pub async fn get_order(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<PharmacyOrder>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(dispensary::get_pharmacy_order(&conn, id)?))
}

/// `POST /api/pharmacist/orders/:id/dispense/`
pub async fn dispense_order(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<PharmacyOrder>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(dispensary::dispense_pharmacy_order(&conn, id)?))
}

/// `GET /api/pharmacist/prescriptions/?dispensed=`
pub async fn list_prescriptions(
    State(ctx): State<ApiContext>,
    Query(query): Query<DispensedQuery>,
) -> Result<Json<Vec<Prescription>>, ApiError> {
    let dispensed = parse_flag("dispensed", query.dispensed.as_deref())?;
    let conn = ctx.core.open_db()?;
    Ok(Json(dispensary::list_prescriptions(&conn, dispensed)?))
}

/// `GET /api/pharmacist/prescriptions/:id/`
pub async fn get_prescription(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<Prescription>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(dispensary::get_prescription(&conn, id)?))
}

/// `POST /api/pharmacist/prescriptions/:id/dispense/`
pub async fn dispense_prescription(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<Prescription>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(dispensary::dispense_prescription(&conn, id)?))
}
