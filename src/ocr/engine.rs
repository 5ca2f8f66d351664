//! Recognition engine backends.
//!
//! The engine itself is an external collaborator. Both backends speak the
//! PaddleOCR `ocr()` result shape: a JSON list of pages, each page a list of
//! `[box, [text, confidence]]` entries or `null`. Only the first page is
//! handed on, since every request carries a single image.

use std::{path::Path, process::Output, sync::Arc, time::Duration};

use serde_json::Value;
use tokio::process::Command;

use crate::{
    config::{Config, OcrBackendKind},
    models::ocr_job::Region,
};

/// Errors raised while building or invoking an engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine initialization failed: {0}")]
    Init(String),

    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("engine failed: {0}")]
    Failed(String),

    #[error("engine timed out after {0:?}")]
    Timeout(Duration),

    #[error("engine returned invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("engine request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// A recognition engine bound to one language configuration.
///
/// `recognize` blocks; callers run it on a blocking worker.
pub trait RecognitionEngine: Send + Sync {
    /// Run OCR on the image at `image_path` and return the raw per-line sequence.
    fn recognize(&self, image_path: &Path) -> Result<Value, EngineError>;
}

/// Builds the engine for a region. Called at most once per region by the registry.
pub trait EngineFactory: Send + Sync {
    fn create(&self, region: Region) -> Result<Arc<dyn RecognitionEngine>, EngineError>;
}

/// Extract page 0 from a PaddleOCR page list.
///
/// Anything that is not a page list is passed through untouched so the
/// normalizer can decide what to keep.
pub fn first_page(output: Value) -> Value {
    match output {
        Value::Array(mut pages) => {
            if pages.is_empty() {
                Value::Null
            } else {
                pages.swap_remove(0)
            }
        }
        other => other,
    }
}

/// Runs a local OCR program once per image.
///
/// Invocation: `<program> <args...> --lang <code> <image_path>`; the program
/// must print the JSON page list on stdout. A run that outlives `timeout` is
/// killed, so an abandoned request never leaves the program behind.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    language: &'static str,
    timeout: Duration,
    runtime: tokio::runtime::Handle,
}

impl CommandEngine {
    /// Must be called from within the tokio runtime (including its blocking workers).
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        language: &'static str,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            program: program.into(),
            args,
            language,
            timeout,
            runtime: current_runtime()?,
        })
    }

    async fn run(&self, image_path: &Path) -> Result<Output, EngineError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg("--lang")
            .arg(self.language)
            .arg(image_path)
            .kill_on_drop(true);

        // Dropping the output future on the deadline kills the child.
        match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(output) => Ok(output?),
            Err(_) => Err(EngineError::Timeout(self.timeout)),
        }
    }
}

impl RecognitionEngine for CommandEngine {
    fn recognize(&self, image_path: &Path) -> Result<Value, EngineError> {
        let output = self.runtime.block_on(self.run(image_path))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Failed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let pages: Value = serde_json::from_slice(&output.stdout)?;
        Ok(first_page(pages))
    }
}

fn current_runtime() -> Result<tokio::runtime::Handle, EngineError> {
    tokio::runtime::Handle::try_current()
        .map_err(|e| EngineError::Init(format!("no async runtime available: {e}")))
}

/// Posts the image to a remote OCR server.
///
/// Sends the raw bytes to `<endpoint>?lang=<code>` and expects the JSON page
/// list in the response body. The async client is driven from the blocking
/// worker through the runtime handle captured at construction.
#[derive(Debug, Clone)]
pub struct HttpEngine {
    client: reqwest::Client,
    endpoint: url::Url,
    language: &'static str,
    runtime: tokio::runtime::Handle,
}

impl HttpEngine {
    /// Must be called from within the tokio runtime (including its blocking workers).
    pub fn new(endpoint: &str, language: &'static str, timeout: Duration) -> Result<Self, EngineError> {
        let endpoint = url::Url::parse(endpoint)
            .map_err(|e| EngineError::Init(format!("invalid OCR endpoint: {e}")))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let runtime = current_runtime()?;

        Ok(Self {
            client,
            endpoint,
            language,
            runtime,
        })
    }

    async fn post(&self, image: Vec<u8>) -> Result<Value, EngineError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .query(&[("lang", self.language)])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<Value>().await?)
    }
}

impl RecognitionEngine for HttpEngine {
    fn recognize(&self, image_path: &Path) -> Result<Value, EngineError> {
        let image = std::fs::read(image_path)?;
        let pages = self.runtime.block_on(self.post(image))?;
        Ok(first_page(pages))
    }
}

/// Builds engines from the service configuration.
#[derive(Debug, Clone)]
pub struct ConfiguredEngineFactory {
    backend: OcrBackendKind,
    command: String,
    command_args: Vec<String>,
    endpoint: Option<String>,
    timeout: Duration,
}

impl ConfiguredEngineFactory {
    pub fn from_config(config: &Config) -> Self {
        Self {
            backend: config.ocr_backend,
            command: config.ocr_command.clone(),
            command_args: config.ocr_command_args.clone(),
            endpoint: config.ocr_endpoint.clone(),
            timeout: config.ocr_timeout(),
        }
    }
}

impl EngineFactory for ConfiguredEngineFactory {
    fn create(&self, region: Region) -> Result<Arc<dyn RecognitionEngine>, EngineError> {
        let language = region.language();
        tracing::info!(%region, language, backend = ?self.backend, "initializing OCR engine");

        match self.backend {
            OcrBackendKind::Command => Ok(Arc::new(CommandEngine::new(
                self.command.clone(),
                self.command_args.clone(),
                language,
                self.timeout,
            )?)),
            OcrBackendKind::Http => {
                let endpoint = self.endpoint.as_deref().ok_or_else(|| {
                    EngineError::Init("OCR_ENDPOINT is not configured".to_string())
                })?;
                Ok(Arc::new(HttpEngine::new(endpoint, language, self.timeout)?))
            }
        }
    }
}
