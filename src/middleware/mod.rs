//! HTTP middleware components.

/// Admin token middleware
pub mod auth;
