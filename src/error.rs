// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request (malformed input, validation failures)
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., duplicate category, stale delete intent)
    Conflict(String),

    // 422 Unprocessable Entity (operation not valid in the current state)
    PreconditionFailed(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// The message carried by the error, without the variant name.
    pub fn message(&self) -> &str {
        match self {
            AppError::InternalServerError(msg)
            | AppError::BadRequest(msg)
            | AppError::AuthError(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::PreconditionFailed(msg) => msg,
        }
    }
}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::PreconditionFailed(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on store queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

/// Stored values that fail to decode are a server fault, not a client one.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::BadRequest(format!("Malformed CSV: {}", err))
    }
}
