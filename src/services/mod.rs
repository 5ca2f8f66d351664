//! Business logic services.
//!
//! Services hold the request logic separated from HTTP handlers: key
//! verification and issuance, and the scan pipeline.

pub mod credential_service;
pub mod scan_service;
