//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error code. Failures
/// that must not fail a request (audit writes, last-used updates, store
/// outages during verification) are logged where they happen and never
/// become an `AppError`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed on a path where the store is required
    /// (key issuance).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No `X-API-Key` header was sent.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Missing API key")]
    MissingApiKey,

    /// The presented key is unknown, inactive, or could not be checked.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Admin route called without the configured admin token.
    #[error("Invalid admin token")]
    InvalidAdminToken,

    /// Region code is not one of HK, CN, MO.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid region: {0} (expected HK, CN or MO)")]
    InvalidRegion(String),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Engine invocation, engine timeout, or temp-file I/O failed.
    ///
    /// Returns HTTP 500; the detail is logged, not returned.
    #[error("OCR processing failed: {0}")]
    Processing(String),
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `MissingApiKey` → 401 Unauthorized
/// - `InvalidAdminToken` → 401 Unauthorized
/// - `InvalidApiKey` → 403 Forbidden
/// - `InvalidRegion` / `InvalidRequest` → 400 Bad Request
/// - `Processing` / `Database` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::MissingApiKey => (
                StatusCode::UNAUTHORIZED,
                "missing_api_key",
                self.to_string(),
            ),
            AppError::InvalidApiKey => {
                (StatusCode::FORBIDDEN, "invalid_api_key", self.to_string())
            }
            AppError::InvalidAdminToken => (
                StatusCode::UNAUTHORIZED,
                "invalid_admin_token",
                self.to_string(),
            ),
            AppError::InvalidRegion(_) => {
                (StatusCode::BAD_REQUEST, "invalid_region", self.to_string())
            }
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Processing(ref detail) => {
                tracing::error!(detail = %detail, "OCR request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "ocr_failed",
                    "OCR processing failed".to_string(),
                )
            }
            AppError::Database(ref err) => {
                tracing::error!(error = %err, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
