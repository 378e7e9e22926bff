//! Bearer token authentication and role gates.
//!
//! `require_auth` extracts `Authorization: Bearer <token>`, looks the token
//! up in the in-memory store and resolves the account into a `Principal`
//! injected into request extensions. `require_access` then checks the
//! principal against the `Access` of the endpoint group.

use axum::extract::State;
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::authorization::{self, Access, AccessReason, Principal};

/// Require a live access token for an active account.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
/// On success: injects `Principal` and adds `Cache-Control: no-store`.
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    // 1. Extract bearer token
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unauthorized)?
        .to_string();

    // 2. Validate against the token store
    let account_id = ctx.lock_tokens()?.validate_access(&token);
    let Some(account_id) = account_id else {
        tracing::warn!(path = %req.uri().path(), "Rejected unknown or expired access token");
        return Err(ApiError::Unauthorized);
    };

    // 3. Resolve the caller from the database (account may be gone or inactive)
    let principal = {
        let conn = ctx.core.open_db()?;
        authorization::resolve_principal(&conn, account_id)?
    };
    let Some(principal) = principal else {
        tracing::warn!(account_id, "Token presented for missing or inactive account");
        ctx.lock_tokens()?.revoke_account(account_id);
        return Err(ApiError::Unauthorized);
    };

    // 4. Inject principal for downstream handlers
    req.extensions_mut().insert(principal);

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert("Cache-Control", HeaderValue::from_static("no-store"));

    Ok(response)
}

/// Gate an endpoint group. Mount with `from_fn_with_state(access, require_access)`
/// inside `require_auth`.
pub async fn require_access(
    State(access): State<Access>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(principal) = req.extensions().get::<Principal>() else {
        return ApiError::Unauthorized.into_response();
    };
    match principal.check(access) {
        AccessReason::Denied => {
            tracing::warn!(
                account_id = principal.account_id,
                required = ?access,
                path = %req.uri().path(),
                "Access denied"
            );
            ApiError::Forbidden.into_response()
        }
        reason => {
            tracing::debug!(account_id = principal.account_id, ?reason, "Access granted");
            next.run(req).await
        }
    }
}
