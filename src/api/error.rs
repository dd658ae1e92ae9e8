//! API Error Types
//!
//! Maps errors from every layer to HTTP status codes and a JSON body:
//!
//! ```json
//! { "error": { "code": "NOT_FOUND", "message": "..." }, "request_id": "..." }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;
use crate::documents::DocumentError;
use crate::finance::FinanceError;
use crate::store::StoreError;
use crate::wizard::{FieldError, WizardError};

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or invalid credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request conflicts with current state
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Wizard(#[from] WizardError),

    #[error(transparent)]
    Finance(#[from] FinanceError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Service unavailable (dependency down)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    /// Per-field validation failures
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

fn finance_status(e: &FinanceError) -> (StatusCode, &'static str) {
    match e {
        FinanceError::ExceedsRemaining { .. } | FinanceError::AlreadyFunded => {
            (StatusCode::CONFLICT, "FUNDING_CONFLICT")
        }
        _ => (StatusCode::BAD_REQUEST, "INVALID_LOAN_TERMS"),
    }
}

fn store_status(e: &StoreError) -> (StatusCode, &'static str) {
    match e {
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        StoreError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
        StoreError::InvalidTransition { .. } => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
        StoreError::Funding(e) => finance_status(e),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR"),
    }
}

impl ApiError {
    /// Status code and machine-readable code for this error
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Store(e) => store_status(e),
            ApiError::Auth(e) => match e {
                AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
                AuthError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                AuthError::Store(e) => store_status(e),
            },
            ApiError::Wizard(e) => match e {
                WizardError::NotFound(_) => (StatusCode::NOT_FOUND, "WIZARD_NOT_FOUND"),
                WizardError::UnknownField(_) | WizardError::Invalid(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
                }
                WizardError::StepLocked(_) => (StatusCode::CONFLICT, "STEP_LOCKED"),
                WizardError::TooManySessions(_) => (StatusCode::CONFLICT, "TOO_MANY_SESSIONS"),
                WizardError::Finance(e) => finance_status(e),
            },
            ApiError::Finance(e) => finance_status(e),
            ApiError::Document(e) => match e {
                DocumentError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                DocumentError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
                _ => (StatusCode::BAD_REQUEST, "INVALID_DOCUMENT"),
            },
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        let request_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "API error occurred"
            );
        } else {
            tracing::debug!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "Request rejected"
            );
        }

        let fields = match &self {
            ApiError::Wizard(WizardError::Invalid(errors)) => errors.clone(),
            _ => Vec::new(),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
                fields,
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ApplicationStatus;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Store(StoreError::NotFound("application".into())).status().0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Store(StoreError::InvalidTransition {
                from: ApplicationStatus::Submitted,
                to: ApplicationStatus::Funded,
            })
            .status()
            .0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Store(StoreError::Funding(FinanceError::AlreadyFunded)).status().0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Finance(FinanceError::InvalidTerm(0)).status().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Auth(AuthError::InvalidCredentials).status().0,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Wizard(WizardError::StepLocked(crate::wizard::StepId::Review)).status().0,
            StatusCode::CONFLICT
        );
    }
}
