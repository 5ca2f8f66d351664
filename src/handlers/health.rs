//! Health and version endpoints for service monitoring.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{models::ocr_job::Region, state::AppState};

/// Health check response.
///
/// Returns service status and database connectivity.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,

    /// `connected` or `disconnected`
    pub database: String,

    /// Regions whose engine is already built
    pub engines_ready: Vec<Region>,

    /// Current server timestamp
    pub timestamp: DateTime<Utc>,
}

/// Health check handler.
///
/// # Checks
///
/// - Database connectivity (reads at most one `api_keys` row)
///
/// Engines are only inspected, never built, so a cold cache stays cold.
///
/// # Response (always 200 OK)
///
/// ```json
/// {
///   "status": "healthy",
///   "database": "connected",
///   "engines_ready": ["HK"],
///   "timestamp": "2026-02-05T14:38:00Z"
/// }
/// ```
///
/// A failed database check reports `"degraded"` / `"disconnected"` instead of an error.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, database) = match state.keys.ping().await {
        Ok(()) => ("healthy", "connected"),
        Err(e) => {
            tracing::warn!(error = %e, "health check could not reach the database");
            ("degraded", "disconnected")
        }
    };

    let engines = state.pipeline.engines();
    let engines_ready = Region::ALL
        .into_iter()
        .filter(|region| engines.is_initialized(*region))
        .collect();

    Json(HealthResponse {
        status: status.to_string(),
        database: database.to_string(),
        engines_ready,
        timestamp: Utc::now(),
    })
}

/// Static build metadata.
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub started_at: DateTime<Utc>,
}

/// `GET /version`
pub async fn version(State(state): State<AppState>) -> Json<VersionResponse> {
    Json(VersionResponse {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        started_at: state.started_at,
    })
}
