//! Error handling module for the church administration backend.
//!
//! Provides a centralized error type with mapping to HTTP status codes and
//! JSON error bodies. Handlers translate validation and persistence failures
//! into this taxonomy; nothing else is allowed to escape to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Missing/invalid/expired token, or bad credentials
    Unauthorized(String),
    /// Authenticated but insufficient role
    Forbidden(String),
    /// Referenced entity absent
    NotFound(String),
    /// Malformed/missing/out-of-range input, with the violated fields
    Validation(Vec<String>),
    /// Duplicate value for a unique field
    Conflict(String),
    /// Downstream persistence failure
    Database(String),
    /// Unexpected failure
    Internal(String),
    /// Malformed request outside field validation (e.g. bad multipart)
    BadRequest(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Get the user-visible error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::Forbidden(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Validation(_) => "Invalid input".to_string(),
            AppError::Conflict(msg) => msg.clone(),
            // Internal details are logged, not leaked to the client
            AppError::Database(_) => "Internal server error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::BadRequest(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Validation(details) => write!(f, "Invalid input: {}", details.join(", ")),
            AppError::Database(msg) | AppError::Internal(msg) => write!(f, "{}", msg),
            other => write!(f, "{}", other.message()),
        }
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return AppError::Conflict("Duplicate value for a unique field".to_string());
            }
        }
        tracing::error!("Database error: {:?}", err);
        AppError::Database(format!("Database error: {}", err))
    }
}

/// JSON error body: `{"error": "...", "details": [...]}` with details only
/// present for validation failures.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let details = match &self {
            AppError::Validation(fields) => Some(fields.clone()),
            _ => None,
        };
        let body = ErrorBody {
            error: self.message(),
            details,
        };
        (status, Json(body)).into_response()
    }
}
