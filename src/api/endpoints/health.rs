//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub schema_version: i64,
}

/// `GET /api/health`: liveness plus a database round trip.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let schema_version = db::get_current_version(&conn);

    Ok(Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        uptime_secs: ctx.core.uptime().as_secs(),
        schema_version,
    }))
}
