//! Error types for the aggregator and its client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chronos_storage::StorageError;

/// A submission that does not have the required shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Request failures, rendered as `{"error": message}`.
#[derive(Debug)]
pub enum AppError {
    /// Malformed submission or query
    BadRequest(String),
    /// Unknown route
    NotFound,
    /// Unexpected failure
    Internal(String),
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::BadRequest(e.0)
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(s) => (StatusCode::BAD_REQUEST, s),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            AppError::Internal(s) => {
                tracing::error!(target: "chronos-sync", error = %s, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, s)
            }
        };
        error_response(status, message)
    }
}

/// `{"error": message}` with the given status.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// Errors pushing records to an aggregator.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Transport or decoding failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A submission could not be encoded
    #[error("encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// The server answered with a non-success status
    #[error("server rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// The server's error message
        message: String,
    },
}
