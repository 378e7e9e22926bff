//! API error types with structured JSON responses.
//!
//! Every failure renders `{"detail": "...", "code": "..."}`. Validation
//! failures add `errors` (field → messages); a refused account generation
//! adds the existing `username`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::consultation::ConsultationError;
use crate::core_state::CoreError;
use crate::db::DatabaseError;
use crate::dispensary::DispensaryError;
use crate::front_desk::FrontDeskError;
use crate::laboratory::LaboratoryError;
use crate::staff::StaffError;
use crate::validation::FieldErrors;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication credentials were not provided or are invalid")]
    Unauthorized,
    #[error("No active account found with the given credentials")]
    InvalidCredentials,
    #[error("You do not have permission to perform this action")]
    Forbidden,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),
    #[error("Account already exists for this employee")]
    AccountExists { username: String },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "NOT_AUTHENTICATED"),
            ApiError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::AccountExists { .. } => (StatusCode::BAD_REQUEST, "ACCOUNT_EXISTS"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        };

        let detail = match &self {
            ApiError::NotFound(detail) | ApiError::BadRequest(detail) => detail.clone(),
            ApiError::Validation(_) => "Invalid input.".to_string(),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let (errors, username) = match self {
            ApiError::Validation(errors) => (Some(errors), None),
            ApiError::AccountExists { username } => (None, Some(username)),
            _ => (None, None),
        };

        let body = ErrorBody {
            detail,
            code,
            errors,
            username,
        };
        (status, Json(body)).into_response()
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, .. } => {
                ApiError::NotFound(format!("{entity_type} not found"))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<StaffError> for ApiError {
    fn from(err: StaffError) -> Self {
        match err {
            StaffError::Validation(errors) => ApiError::Validation(errors),
            StaffError::AccountExists { username } => ApiError::AccountExists { username },
            StaffError::NotFound(_) => ApiError::NotFound(err.to_string()),
            StaffError::Database(e) => e.into(),
        }
    }
}

impl From<ConsultationError> for ApiError {
    fn from(err: ConsultationError) -> Self {
        match err {
            ConsultationError::AppointmentNotFound | ConsultationError::PrescriptionNotFound => {
                ApiError::NotFound(err.to_string())
            }
            ConsultationError::PrescriptionExists | ConsultationError::NoPrescription => {
                ApiError::BadRequest(err.to_string())
            }
            ConsultationError::Validation(errors) => ApiError::Validation(errors),
            ConsultationError::Database(e) => e.into(),
        }
    }
}

impl From<FrontDeskError> for ApiError {
    fn from(err: FrontDeskError) -> Self {
        match err {
            FrontDeskError::Validation(errors) => ApiError::Validation(errors),
            FrontDeskError::NotFound(_) => ApiError::NotFound(err.to_string()),
            FrontDeskError::AlreadyCompleted => ApiError::BadRequest(err.to_string()),
            FrontDeskError::Database(e) => e.into(),
        }
    }
}

impl From<DispensaryError> for ApiError {
    fn from(err: DispensaryError) -> Self {
        match err {
            DispensaryError::NotFound(_) => ApiError::NotFound(err.to_string()),
            DispensaryError::AlreadyDispensed(_) => ApiError::BadRequest(err.to_string()),
            DispensaryError::Database(e) => e.into(),
        }
    }
}

impl From<LaboratoryError> for ApiError {
    fn from(err: LaboratoryError) -> Self {
        match err {
            LaboratoryError::NotFound => ApiError::NotFound(err.to_string()),
            LaboratoryError::AlreadyProcessed => ApiError::BadRequest(err.to_string()),
            LaboratoryError::Database(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn unauthorized_returns_401() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["code"], "NOT_AUTHENTICATED");
        assert!(json.get("errors").is_none());
    }

    #[tokio::test]
    async fn forbidden_returns_403() {
        let response = ApiError::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn validation_lists_field_errors() {
        let errors = FieldErrors::single("department_id", "Doctor must have a department.");
        let response = ApiError::from(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["errors"]["department_id"][0], "Doctor must have a department.");
    }

    #[tokio::test]
    async fn account_exists_carries_username() {
        let err: ApiError = StaffError::AccountExists { username: "doc_5_jsmith".into() }.into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["username"], "doc_5_jsmith");
        assert_eq!(json["code"], "ACCOUNT_EXISTS");
    }

    #[tokio::test]
    async fn appointment_not_found_message() {
        let err: ApiError = ConsultationError::AppointmentNotFound.into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["detail"], "Appointment not found or not assigned to you");
    }

    #[tokio::test]
    async fn internal_hides_detail() {
        let response = ApiError::Internal("disk on fire".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["detail"], "An internal error occurred");
    }

    #[tokio::test]
    async fn database_not_found_maps_to_404() {
        let err: ApiError = DatabaseError::NotFound {
            entity_type: "BillingRecord".into(),
            id: "3".into(),
        }
        .into();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
