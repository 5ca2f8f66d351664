//! OCR scan endpoint.
//!
//! - POST /v1/ocr/scan - recognize text in one uploaded image

use axum::{
    Json,
    extract::{
        Multipart, Query, State, multipart::MultipartRejection, rejection::QueryRejection,
    },
    http::HeaderMap,
};
use serde::Deserialize;

use crate::{
    error::AppError,
    models::ocr_job::ScanResponse,
    services::scan_service::{ScanRequest, UploadedFile},
    state::AppState,
};

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Region used when neither the form nor the query names one.
const DEFAULT_REGION: &str = "HK";

#[derive(Debug, Default, Deserialize)]
pub struct ScanQuery {
    pub region: Option<String>,
}

/// Scan an uploaded image.
///
/// # Endpoint
///
/// `POST /v1/ocr/scan`
///
/// # Request
///
/// - Header `X-API-Key: <key>` (required)
/// - Multipart field `file` (required): the image
/// - Multipart field `region` or query `?region=` (optional, defaults to `HK`):
///   one of `HK`, `CN`, `MO`; the form field wins when both are sent
///
/// # Response
///
/// - **Success (200 OK)**: [`ScanResponse`]
/// - **Error (400)**: invalid region, missing file, malformed multipart body
/// - **Error (401)**: missing API key
/// - **Error (403)**: unknown or inactive API key
/// - **Error (500)**: engine failure or timeout
///
/// A missing key is rejected before the body is read, so an oversized or
/// malformed upload from an anonymous caller still gets 401. A body that is
/// not multipart at all is treated as "no file", so the region and key
/// checks still decide the status first.
pub async fn scan(
    State(state): State<AppState>,
    query: Result<Query<ScanQuery>, QueryRejection>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ScanResponse>, AppError> {
    // Reject anonymous callers before reading a single body byte.
    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .ok_or(AppError::MissingApiKey)?;

    let Query(query) =
        query.map_err(|e| AppError::InvalidRequest(format!("Invalid query string: {e}")))?;

    let mut form_region = None;
    let mut file = None;

    if let Ok(mut multipart) = multipart {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::InvalidRequest(format!("Malformed multipart body: {e}")))?
        {
            match field.name().unwrap_or("") {
                "file" => {
                    let filename = field.file_name().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::InvalidRequest(format!("Failed to read file: {e}")))?;
                    file = Some(UploadedFile { filename, bytes });
                }
                "region" => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::InvalidRequest(format!("Invalid region field: {e}")))?;
                    form_region = Some(value);
                }
                // Unknown fields are skipped; the next `next_field` drains them.
                _ => {}
            }
        }
    }

    let region = form_region
        .or(query.region)
        .unwrap_or_else(|| DEFAULT_REGION.to_string());

    let response = state
        .pipeline
        .handle(ScanRequest {
            api_key: Some(api_key),
            region,
            file,
        })
        .await?;

    Ok(Json(response))
}
