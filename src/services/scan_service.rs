//! Scan pipeline - end-to-end handling of one OCR request.
//!
//! # Flow
//!
//! 1. Require an API key
//! 2. Validate the region code (before any store or disk work)
//! 3. Verify the key against the credential store
//! 4. Buffer the upload to a scoped temp file
//! 5. Run the region's engine on a blocking worker, under a timeout
//! 6. Normalize the output and compute the mean confidence
//! 7. Write a best-effort audit record
//!
//! The temp file name is owned by a `TempPath` guard held on the async side,
//! so it is removed on every exit path, including engine errors and both
//! timeouts. `processing_time_ms` covers buffering, recognition and
//! normalization.

use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::body::Bytes;
use tempfile::TempPath;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

use crate::{
    config::Config,
    error::AppError,
    models::{
        api_key::ApiKey,
        ocr_job::{JobStatus, NewOcrJob, RecognizedLine, Region, ScanResponse},
    },
    ocr::{EngineRegistry, normalize},
    services::credential_service::{self, CredentialError},
    store::{CredentialStore, JobStore},
};

/// One uploaded image as received by the HTTP layer.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub bytes: Bytes,
}

/// Inputs of a scan request, unvalidated.
#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    pub api_key: Option<String>,
    pub region: String,
    pub file: Option<UploadedFile>,
}

/// Tunables for the pipeline, taken from [`Config`].
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub temp_dir: PathBuf,
    pub include_boxes: bool,
    pub engine_timeout: Duration,
    pub upload_timeout: Duration,
}

impl ScanSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            temp_dir: config.temp_dir(),
            include_boxes: config.ocr_include_boxes,
            engine_timeout: config.ocr_timeout(),
            upload_timeout: config.upload_timeout(),
        }
    }
}

pub struct ScanPipeline {
    keys: Arc<dyn CredentialStore>,
    jobs: Arc<dyn JobStore>,
    engines: Arc<EngineRegistry>,
    settings: ScanSettings,
}

impl ScanPipeline {
    pub fn new(
        keys: Arc<dyn CredentialStore>,
        jobs: Arc<dyn JobStore>,
        engines: Arc<EngineRegistry>,
        settings: ScanSettings,
    ) -> Self {
        Self {
            keys,
            jobs,
            engines,
            settings,
        }
    }

    pub fn engines(&self) -> &EngineRegistry {
        &self.engines
    }

    /// Run one scan request to completion.
    ///
    /// # Errors
    ///
    /// - `MissingApiKey`: no key presented
    /// - `InvalidRegion`: region is not HK, CN or MO
    /// - `InvalidApiKey`: key unknown, inactive, or the store is unreachable
    /// - `InvalidRequest`: no file, or an empty one
    /// - `Processing`: temp-file I/O, engine failure, or timeout
    pub async fn handle(&self, request: ScanRequest) -> Result<ScanResponse, AppError> {
        let presented_key = request
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(AppError::MissingApiKey)?;

        let region: Region = request
            .region
            .parse()
            .map_err(|_| AppError::InvalidRegion(request.region.clone()))?;

        let key = self.authenticate(presented_key).await?;

        let file = request
            .file
            .filter(|file| !file.bytes.is_empty())
            .ok_or_else(|| AppError::InvalidRequest("a non-empty file is required".to_string()))?;

        let job_id = Uuid::new_v4();
        let started = Instant::now();
        tracing::info!(
            %job_id,
            %region,
            key_id = %key.id,
            file_size = file.bytes.len(),
            filename = file.filename.as_deref().unwrap_or(""),
            "processing scan"
        );

        let lines = match self.recognize(region, file.bytes.clone()).await {
            Ok(lines) => lines,
            Err(err) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let job = failed_job(job_id, &key, &file, region, elapsed_ms, &err);
                self.record(&job).await;
                return Err(err);
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let confidence_avg = normalize::average_confidence(&lines);
        let raw_text = normalize::join_text(&lines);

        tracing::info!(
            %job_id,
            total_lines = lines.len(),
            confidence_avg,
            processing_time_ms = elapsed_ms,
            "scan complete"
        );

        let job = NewOcrJob {
            id: job_id,
            account_id: key.account_id.clone(),
            api_key_id: key.id,
            filename: file.filename.clone(),
            file_size: file.bytes.len() as i64,
            region,
            status: JobStatus::Success,
            total_lines: lines.len() as i32,
            raw_text: raw_text.clone(),
            lines: lines.clone(),
            confidence_avg,
            processing_time_ms: elapsed_ms as i64,
            error_message: None,
        };
        self.record(&job).await;

        Ok(ScanResponse {
            status: JobStatus::Success,
            job_id,
            region,
            total_lines: lines.len(),
            lines,
            raw_text,
            confidence_avg,
            processing_time_ms: elapsed_ms,
        })
    }

    async fn authenticate(&self, presented_key: &str) -> Result<ApiKey, AppError> {
        match credential_service::verify(&self.keys, presented_key).await {
            Ok(key) => Ok(key),
            Err(CredentialError::NotFound) => {
                tracing::warn!(
                    key = credential_service::key_preview(presented_key),
                    "rejected unknown or inactive API key"
                );
                Err(AppError::InvalidApiKey)
            }
            Err(CredentialError::Store(e)) => {
                tracing::error!(error = %e, "credential store unavailable, denying request");
                Err(AppError::InvalidApiKey)
            }
        }
    }

    /// Buffer, recognize, normalize. The temp file lives exactly as long as this call.
    async fn recognize(&self, region: Region, bytes: Bytes) -> Result<Vec<RecognizedLine>, AppError> {
        let upload = self.buffer_upload(bytes).await?;
        let image_path = upload.to_path_buf();

        let engine = self
            .engines
            .get(region)
            .await
            .map_err(|e| AppError::Processing(format!("engine unavailable for {region}: {e}")))?;

        let task = tokio::task::spawn_blocking(move || engine.recognize(&image_path));
        let raw = match tokio::time::timeout(self.settings.engine_timeout, task).await {
            Ok(Ok(Ok(raw))) => raw,
            Ok(Ok(Err(e))) => return Err(AppError::Processing(e.to_string())),
            Ok(Err(e)) => return Err(AppError::Processing(format!("engine task failed: {e}"))),
            Err(_) => {
                return Err(AppError::Processing(format!(
                    "engine timed out after {:?}",
                    self.settings.engine_timeout
                )));
            }
        };

        let lines = normalize::normalize(Some(&raw), self.settings.include_boxes);

        if let Err(e) = upload.close() {
            tracing::warn!(error = %e, "failed to remove temp upload");
        }

        Ok(lines)
    }

    /// Write the upload to `ocr_*.jpg` in the temp dir.
    async fn buffer_upload(&self, bytes: Bytes) -> Result<TempPath, AppError> {
        self.buffer_upload_with(bytes, tokio::fs::File::from_std).await
    }

    /// Create the temp file, then write through the writer `open` wraps it in.
    ///
    /// The returned `TempPath` is the only owner of the file name; every error
    /// (including the write timeout) drops it, which deletes the file.
    async fn buffer_upload_with<W, F>(&self, bytes: Bytes, open: F) -> Result<TempPath, AppError>
    where
        W: AsyncWrite + Unpin,
        F: FnOnce(std::fs::File) -> W,
    {
        let dir = self.settings.temp_dir.clone();
        let created = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix("ocr_")
                .suffix(".jpg")
                .tempfile_in(&dir)
        })
        .await;
        let (file, path) = match created {
            Ok(Ok(named)) => named.into_parts(),
            Ok(Err(e)) => return Err(AppError::Processing(format!("failed to create temp upload: {e}"))),
            Err(e) => return Err(AppError::Processing(format!("upload task failed: {e}"))),
        };

        let mut writer = open(file);
        let write = async {
            writer.write_all(&bytes).await?;
            writer.flush().await
        };

        match tokio::time::timeout(self.settings.upload_timeout, write).await {
            Ok(Ok(())) => Ok(path),
            Ok(Err(e)) => Err(AppError::Processing(format!("failed to buffer upload: {e}"))),
            Err(_) => Err(AppError::Processing(format!(
                "timed out buffering upload after {:?}",
                self.settings.upload_timeout
            ))),
        }
    }

    async fn record(&self, job: &NewOcrJob) {
        if let Err(e) = self.jobs.insert_job(job).await {
            tracing::warn!(job_id = %job.id, error = %e, "failed to persist OCR job record");
        }
    }
}

fn failed_job(
    job_id: Uuid,
    key: &ApiKey,
    file: &UploadedFile,
    region: Region,
    elapsed_ms: u64,
    err: &AppError,
) -> NewOcrJob {
    NewOcrJob {
        id: job_id,
        account_id: key.account_id.clone(),
        api_key_id: key.id,
        filename: file.filename.clone(),
        file_size: file.bytes.len() as i64,
        region,
        status: JobStatus::Failure,
        total_lines: 0,
        raw_text: String::new(),
        lines: Vec::new(),
        confidence_avg: 0.0,
        processing_time_ms: elapsed_ms as i64,
        error_message: Some(err.to_string()),
    }
}
