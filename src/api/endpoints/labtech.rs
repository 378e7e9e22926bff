//! Lab technician endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::endpoints::parse_flag;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::laboratory;
use crate::models::LabOrder;

#[derive(Deserialize)]
pub struct ProcessedQuery {
    pub processed: Option<String>,
}

/// `GET /api/labtech/orders/?processed=`
pub async fn list_orders(
    State(ctx): State<ApiContext>,
    Query(query): Query<ProcessedQuery>,
) -> Result<Json<Vec<LabOrder>>, ApiError> {
    let processed = parse_flag("processed", query.processed.as_deref())?;
    let conn = ctx.core.open_db()?;
    Ok(Json(laboratory::list_lab_orders(&conn, processed)?))
}

/// `GET /api/labtech/orders/:id/`
pub async fn get_order(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<LabOrder>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(laboratory::get_lab_order(&conn, id)?))
}

/// `POST /api/labtech/orders/:id/process/`
pub async fn process_order(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<LabOrder>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(laboratory::process_lab_order(&conn, id)?))
}
