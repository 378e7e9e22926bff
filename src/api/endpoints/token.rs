//! Token endpoints.
//!
//! `POST /api/token/` (unprotected): username + password → access/refresh pair
//! `POST /api/token/refresh/` (unprotected): refresh token → new access token

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, TokenPair};
use crate::crypto;
use crate::db;

#[derive(Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh: String,
}

#[derive(Serialize)]
pub struct AccessResponse {
    pub access: String,
}

/// `POST /api/token/`: authenticate and issue a token pair.
///
/// Unknown user, wrong password and inactive account all yield the same 401.
pub async fn obtain(
    State(ctx): State<ApiContext>,
    ApiJson(request): ApiJson<TokenRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::InvalidCredentials);
    }

    let core = ctx.core.clone();
    let username = request.username.clone();
    // PBKDF2 verification runs off the async workers.
    let verified = tokio::task::spawn_blocking(move || -> Result<Option<i64>, ApiError> {
        let conn = core.open_db()?;
        let Some(account) = db::get_account_by_username(&conn, &username)? else {
            return Ok(None);
        };
        let matches = crypto::verify_password(&request.password, &account.password_hash)
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        Ok((matches && account.is_active).then_some(account.id))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("password check task: {e}")))??;

    let Some(account_id) = verified else {
        tracing::warn!(username = %request.username, "Rejected login");
        return Err(ApiError::InvalidCredentials);
    };

    let pair = ctx.lock_tokens()?.issue_pair(account_id);
    tracing::info!(account_id, username = %request.username, "Token pair issued");
    Ok(Json(pair))
}

/// `POST /api/token/refresh/`: exchange a refresh token for a new access token.
pub async fn refresh(
    State(ctx): State<ApiContext>,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> Result<Json<AccessResponse>, ApiError> {
    let access = ctx
        .lock_tokens()?
        .refresh(request.refresh.trim())
        .ok_or(ApiError::Unauthorized)?;
    Ok(Json(AccessResponse { access }))
}
