use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::AuthError;
use crate::payload::PayloadError;
use crate::repos::DbError;
use crate::uploads::{IntakeError, StorageError};
use crate::utils::response::{error as error_response, errors as errors_response};

const SERVER_ERROR_MESSAGE: &str = "Server error";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Authentication error: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Storage error")]
    Storage(#[from] StorageError),

    #[error("Auth backend error")]
    Auth(#[from] AuthError),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(vec![message.into()])
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_)
            | AppError::Storage(_)
            | AppError::Auth(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn log(&self) {
        match self {
            AppError::Validation(messages) => {
                warn!(errors = ?messages, "Validation failed");
            }
            AppError::Unauthorized(msg) | AppError::NotFound(msg) | AppError::Conflict(msg) => {
                warn!(status = %self.status_code(), message = %msg, "Request rejected");
            }
            AppError::Database(e) => {
                error!(error = ?e, "Database error");
            }
            AppError::Storage(e) => {
                error!(error = %e, "Storage error");
            }
            AppError::Auth(e) => {
                error!(error = %e, "Auth backend error");
            }
            AppError::Internal(msg) => {
                error!(message = %msg, "Internal server error");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log internal details
        self.log();

        // Only expose client-correctable messages
        match self {
            AppError::Validation(messages) => errors_response(messages, status),
            AppError::Unauthorized(msg) | AppError::NotFound(msg) | AppError::Conflict(msg) => {
                error_response(msg, status)
            }
            AppError::Database(_)
            | AppError::Storage(_)
            | AppError::Auth(_)
            | AppError::Internal(_) => error_response(SERVER_ERROR_MESSAGE, status),
        }
    }
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Conflict { constraint } if constraint == "users_email_key" => {
                AppError::Conflict("Email already exists".to_string())
            }
            DbError::Conflict { constraint } => {
                AppError::Conflict(format!("Duplicate value violates '{constraint}'"))
            }
            DbError::Sqlx(e) => AppError::Database(e),
        }
    }
}

impl From<PayloadError> for AppError {
    fn from(e: PayloadError) -> Self {
        match e {
            PayloadError::Invalid(messages) => AppError::Validation(messages),
            PayloadError::Storage(e) => AppError::Storage(e),
        }
    }
}

impl From<IntakeError> for AppError {
    fn from(e: IntakeError) -> Self {
        match e {
            IntakeError::Rejected(message) => AppError::validation(message),
            IntakeError::Storage(e) => AppError::Storage(e),
        }
    }
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}
