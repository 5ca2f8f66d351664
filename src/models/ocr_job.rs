//! Scan job data models and API response types.
//!
//! This module defines:
//! - `Region`: jurisdiction tag selecting the engine language
//! - `RecognizedLine`: one normalized line of OCR output
//! - `NewOcrJob`: audit record written to the `ocr_jobs` table
//! - `ScanResponse`: response body returned to clients

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// Jurisdiction tag selecting which language configuration of the engine to use.
///
/// Serialized and parsed as the upper-case codes `HK`, `CN`, `MO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    Hk,
    Cn,
    Mo,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Hk, Region::Cn, Region::Mo];

    pub fn code(self) -> &'static str {
        match self {
            Region::Hk => "HK",
            Region::Cn => "CN",
            Region::Mo => "MO",
        }
    }

    /// PaddleOCR language code handed to the engine.
    ///
    /// Hong Kong and Macau use traditional Chinese, mainland China simplified.
    pub fn language(self) -> &'static str {
        match self {
            Region::Hk | Region::Mo => "chinese_cht",
            Region::Cn => "ch",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Raised when a region string is not one of the enumerated codes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown region code: {0}")]
pub struct UnknownRegion(pub String);

impl FromStr for Region {
    type Err = UnknownRegion;

    // Exact, case-sensitive match.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HK" => Ok(Region::Hk),
            "CN" => Ok(Region::Cn),
            "MO" => Ok(Region::Mo),
            other => Err(UnknownRegion(other.to_string())),
        }
    }
}

/// One recognized line of text.
///
/// # JSON Example
///
/// ```json
/// {
///   "text": "商業登記證",
///   "confidence": 0.987,
///   "box": [[12.0, 8.0], [220.0, 8.0], [220.0, 40.0], [12.0, 40.0]]
/// }
/// ```
///
/// `box` is omitted when geometry is disabled or the engine's polygon was unusable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedLine {
    pub text: String,

    pub confidence: f64,

    #[serde(rename = "box", default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<Vec<[f64; 2]>>,
}

/// Outcome of a scan job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Success,
    Failure,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Success => "success",
            JobStatus::Failure => "failure",
        }
    }
}

/// Audit record for one scan request.
///
/// # Database Table
///
/// Maps to the `ocr_jobs` table. Written once per request after the engine
/// has run (or failed); a failed insert never fails the request.
#[derive(Debug, Clone)]
pub struct NewOcrJob {
    pub id: Uuid,
    pub account_id: String,
    pub api_key_id: Uuid,
    pub filename: Option<String>,
    pub file_size: i64,
    pub region: Region,
    pub status: JobStatus,
    pub total_lines: i32,
    pub raw_text: String,
    pub lines: Vec<RecognizedLine>,
    pub confidence_avg: f64,
    pub processing_time_ms: i64,
    pub error_message: Option<String>,
}

impl NewOcrJob {
    /// JSON stored in `structured_data`.
    pub fn structured_data(&self) -> serde_json::Value {
        json!({ "lines": self.lines })
    }
}

/// Response body for a successful scan.
///
/// # JSON Example
///
/// ```json
/// {
///   "status": "success",
///   "job_id": "770e8400-e29b-41d4-a716-446655440002",
///   "region": "HK",
///   "lines": [{ "text": "ABC", "confidence": 0.9 }],
///   "raw_text": "ABC",
///   "total_lines": 1,
///   "confidence_avg": 0.9,
///   "processing_time_ms": 412
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResponse {
    pub status: JobStatus,
    pub job_id: Uuid,
    pub region: Region,
    pub lines: Vec<RecognizedLine>,
    pub raw_text: String,
    pub total_lines: usize,
    pub confidence_avg: f64,
    pub processing_time_ms: u64,
}
