/// Unified error types for the TMS server
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Whether unexpected-error details are attached to responses.
/// Set once at startup from the configured environment.
static EXPOSE_DETAILS: AtomicBool = AtomicBool::new(false);

pub fn set_expose_details(expose: bool) {
    EXPOSE_DETAILS.store(expose, Ordering::Relaxed);
}

/// Authentication and session failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email and wrong password share this variant so callers cannot tell them apart
    #[error("Incorrect credentials")]
    IncorrectCredentials,

    #[error("No token provided")]
    NoTokenProvided,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Already logged in")]
    AlreadyLoggedIn,

    #[error("Failed to update refresh token")]
    FailedRefreshPersist,

    #[error("Invalid Authorization Header")]
    InvalidAuthorizationHeader,

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("{0}")]
    Forbidden(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::IncorrectCredentials
            | AuthError::NoTokenProvided
            | AuthError::InvalidToken
            | AuthError::ExpiredToken
            | AuthError::InvalidRefreshToken => StatusCode::UNAUTHORIZED,
            AuthError::AlreadyLoggedIn => StatusCode::CONFLICT,
            AuthError::FailedRefreshPersist => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::InvalidAuthorizationHeader
            | AuthError::UnknownRole(_)
            | AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    /// Machine-readable code for clients that special-case a failure
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::IncorrectCredentials => "INCORRECT_CREDENTIALS",
            AuthError::NoTokenProvided => "NO_TOKEN_PROVIDED",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::ExpiredToken => "TOKEN_EXPIRY",
            AuthError::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            AuthError::AlreadyLoggedIn => "ALREADY_LOGGED_IN",
            AuthError::FailedRefreshPersist => "FAILED_REFRESH_PERSIST",
            AuthError::InvalidAuthorizationHeader => "INVALID_AUTHORIZATION_HEADER",
            AuthError::UnknownRole(_) => "UNKNOWN_ROLE",
            AuthError::Forbidden(_) => "FORBIDDEN",
        }
    }
}

/// Main error type for the server
#[derive(Error, Debug)]
pub enum AppError {
    /// Authentication and authorization errors
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Request body or query failed validation
    #[error("Validation failed")]
    Validation(#[from] validator::ValidationErrors),

    /// Malformed request or failed mutation
    #[error("{0}")]
    BadRequest(String),

    /// Conflict errors (e.g., duplicate account)
    #[error("{0}")]
    Conflict(String),

    /// Not found errors
    #[error("{0}")]
    NotFound(String),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(e) => e.status(),
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_)
            | AppError::Migration(_)
            | AppError::Io(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for errors that were not anticipated by a handler
    pub fn is_unexpected(&self) -> bool {
        self.status() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Error envelope returned to clients
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Flatten validator output into `{ field: [messages] }`
fn field_errors(errors: &validator::ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("invalid {}", e.code))
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::Auth(e) => {
                tracing::warn!(code = e.code(), "{}", e);
                ErrorBody {
                    success: false,
                    message: e.to_string(),
                    code: Some(e.code()),
                    errors: None,
                    detail: None,
                }
            }
            AppError::Validation(errors) => ErrorBody {
                success: false,
                message: self.to_string(),
                code: None,
                errors: Some(field_errors(errors)),
                detail: None,
            },
            _ if self.is_unexpected() => {
                // Request span carries method, path and caller id
                tracing::error!(error = %self, "Unexpected error");
                ErrorBody {
                    success: false,
                    message: "An unexpected error occurred".to_string(),
                    code: None,
                    errors: None,
                    detail: EXPOSE_DETAILS
                        .load(Ordering::Relaxed)
                        .then(|| self.to_string()),
                }
            }
            _ => ErrorBody {
                success: false,
                message: self.to_string(),
                code: None,
                errors: None,
                detail: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for server operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_statuses() {
        assert_eq!(AuthError::IncorrectCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::ExpiredToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::AlreadyLoggedIn.status(), StatusCode::CONFLICT);
        assert_eq!(
            AuthError::Forbidden("nope".to_string()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AuthError::ExpiredToken.code(), "TOKEN_EXPIRY");
    }

    #[test]
    fn test_app_error_statuses() {
        assert_eq!(
            AppError::Conflict("User already exists".to_string()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::NotFound("User not found".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert!(AppError::Internal("boom".to_string()).is_unexpected());
        assert!(!AppError::BadRequest("bad".to_string()).is_unexpected());
    }

    #[test]
    fn test_internal_error_hides_details_by_default() {
        let response = AppError::Internal("secret stack".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
