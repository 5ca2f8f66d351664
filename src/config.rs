//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to deserialize environment variables into a type-safe struct.

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

/// Which recognition engine backend serves OCR requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackendKind {
    /// Spawn a local OCR command per request.
    #[default]
    Command,
    /// POST the image to a remote OCR endpoint.
    Http,
}

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 8000
/// - `OCR_BACKEND` (optional): `command` or `http`, defaults to `command`
/// - `OCR_ENDPOINT` (required for the `http` backend): OCR server URL
/// - `ADMIN_TOKEN` (optional): shared secret for the admin routes
///
/// The remaining knobs (timeouts, temp dir, upload limit) all have defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default)]
    pub ocr_backend: OcrBackendKind,

    /// Program spawned by the `command` backend.
    #[serde(default = "default_ocr_command")]
    pub ocr_command: String,

    /// Extra leading arguments for `ocr_command` (comma separated in the environment).
    #[serde(default)]
    pub ocr_command_args: Vec<String>,

    pub ocr_endpoint: Option<String>,

    #[serde(default = "default_ocr_timeout_secs")]
    pub ocr_timeout_secs: u64,

    #[serde(default = "default_upload_timeout_secs")]
    pub upload_timeout_secs: u64,

    /// Include bounding polygons in scan responses.
    #[serde(default = "default_true")]
    pub ocr_include_boxes: bool,

    /// Build every region's engine at startup instead of on first use.
    #[serde(default)]
    pub ocr_eager_init: bool,

    pub ocr_temp_dir: Option<PathBuf>,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    pub admin_token: Option<String>,
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn default_port() -> u16 {
    8000
}

fn default_max_connections() -> u32 {
    5
}

fn default_ocr_command() -> String {
    "paddleocr-json".to_string()
}

fn default_ocr_timeout_secs() -> u64 {
    60
}

fn default_upload_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables, deserializes them into a Config struct
    /// and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    /// - The combination of values is unusable (see [`Config::validate`])
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        let config = envy::from_env::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ocr_timeout_secs == 0 || self.upload_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "OCR_TIMEOUT_SECS and UPLOAD_TIMEOUT_SECS must be positive".to_string(),
            ));
        }

        if self.ocr_backend == OcrBackendKind::Http {
            let endpoint = self.ocr_endpoint.as_deref().ok_or_else(|| {
                ConfigError::Invalid("OCR_ENDPOINT is required for the http backend".to_string())
            })?;
            url::Url::parse(endpoint)
                .map_err(|e| ConfigError::Invalid(format!("OCR_ENDPOINT is not a URL: {e}")))?;
        }

        Ok(())
    }

    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    /// Directory for buffered uploads, falling back to the system temp dir.
    pub fn temp_dir(&self) -> PathBuf {
        self.ocr_temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
