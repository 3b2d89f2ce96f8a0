//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use reel_core::auth::AuthError;
use reel_core::cache::CacheError;
use reel_core::mailer::MailError;
use reel_core::permissions::PermissionError;
use reel_core::repository::RepositoryError;
use reel_core::validation::FieldErrors;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed")]
    Unprocessable(FieldErrors),

    #[error("Rate limit exceeded")]
    TooManyRequests,

    #[error("Upstream call timed out")]
    Timeout,

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, "bad_request", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m.as_str()),
            AppError::Unprocessable(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Validation failed",
            ),
            AppError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Rate limit exceeded",
            ),
            AppError::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "timeout",
                "The server could not complete the request in time",
            ),
            AppError::Internal(detail) => {
                error!(detail = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        let message = message.to_string();
        let fields = match self {
            AppError::Unprocessable(fields) => Some(fields),
            _ => None,
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message,
            fields,
        });
        (status, body).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound(m) => AppError::NotFound(m),
            RepositoryError::Conflict(m) => AppError::Conflict(m),
            RepositoryError::InvalidReference(m) => AppError::BadRequest(m),
            RepositoryError::Database(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<CacheError> for AppError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::KeyMissing(m) => AppError::NotFound(m),
            CacheError::KeyExists(m) => AppError::Conflict(m),
            CacheError::Unavailable(m) => AppError::Internal(m),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::CredentialError => AppError::Unauthorized("invalid credentials".into()),
            AuthError::InvalidToken => {
                AppError::Unauthorized("invalid or missing authentication token".into())
            }
            AuthError::NotActivated => {
                AppError::Forbidden("your user account must be activated".into())
            }
            AuthError::SessionExists(_) => {
                AppError::Conflict("a session is already active for this user".into())
            }
            AuthError::ActivationPending(_) => {
                AppError::Conflict("an activation is already pending for this user".into())
            }
            AuthError::NotFound(m) => AppError::NotFound(m),
            AuthError::BadRequest(m) => AppError::BadRequest(m),
            AuthError::Validation(fields) => AppError::Unprocessable(fields),
            AuthError::Cache(e) => AppError::from(e),
            AuthError::Repository(e) => AppError::from(e),
            AuthError::Signing(m) | AuthError::Internal(m) => AppError::Internal(m),
        }
    }
}

impl From<PermissionError> for AppError {
    fn from(e: PermissionError) -> Self {
        match e {
            PermissionError::InvalidCode(_) => {
                AppError::BadRequest("invalid permission format".into())
            }
            PermissionError::InvalidUserId(id) => {
                AppError::BadRequest(format!("user id must be positive, got {id}"))
            }
            PermissionError::Validation(fields) => AppError::Unprocessable(fields),
            PermissionError::Repository(e) => AppError::from(e),
        }
    }
}

impl From<MailError> for AppError {
    fn from(e: MailError) -> Self {
        AppError::Internal(e.to_string())
    }
}
