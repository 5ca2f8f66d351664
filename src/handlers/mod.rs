//! HTTP request handlers (route handlers).
//!
//! Each handler extracts request data, delegates to a service, and returns
//! JSON or an [`AppError`](crate::error::AppError).

/// Key issuance endpoint
pub mod admin;
/// Health and version endpoints
pub mod health;
/// OCR scan endpoint
pub mod scan;
