//! OCR Scan Service - Main Application Entry Point
//!
//! An authenticated HTTP service that accepts an image upload, runs a
//! region-specific OCR engine over it, and returns normalized text lines
//! with confidences and bounding boxes. Every scan is audited to PostgreSQL.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (API keys and the scan audit log)
//! - **Authentication**: API key in `X-API-Key`, plaintext or SHA-256 hashed
//! - **OCR**: one lazily built engine per region (HK, CN, MO)
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build the engine registry (optionally warming every region)
//! 5. Build HTTP router with routes and middleware
//! 6. Start server on configured port

mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod ocr;
mod routes;
mod services;
mod state;
mod store;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    ocr::{ConfiguredEngineFactory, EngineRegistry},
    services::scan_service::{ScanPipeline, ScanSettings},
    state::AppState,
    store::PgStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG (defaults to "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!(backend = ?config.ocr_backend, "Configuration loaded");

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let store = Arc::new(PgStore::new(pool));

    let factory = ConfiguredEngineFactory::from_config(&config);
    let engines = Arc::new(EngineRegistry::new(Arc::new(factory)));
    if config.ocr_eager_init {
        engines.warm_up().await?;
        tracing::info!("All OCR engines initialized");
    }

    let pipeline = ScanPipeline::new(
        store.clone(),
        store.clone(),
        engines,
        ScanSettings::from_config(&config),
    );

    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN is not set, key issuance is unauthenticated");
    }
    let state = AppState::new(store, pipeline, config.admin_token.clone());

    let app = routes::build_router(state, config.max_upload_bytes);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
