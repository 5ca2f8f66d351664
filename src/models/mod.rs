//! Data models representing database entities and API bodies.

/// API key authentication model
pub mod api_key;
/// Scan job, region and recognized line models
pub mod ocr_job;
