//! API Key model for authentication.
//!
//! API keys authenticate accounts calling the scan endpoint. Minted keys are
//! stored as SHA-256 hashes; legacy rows may still carry the plaintext secret.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents an API key record from the database.
///
/// # Database Table
///
/// Maps to the `api_keys` table with columns:
/// - `id`: Unique identifier (UUID)
/// - `account_id`: Account the key belongs to
/// - `key` / `key_hash`: plaintext secret or its SHA-256 hex digest (at least one is set)
/// - `is_active`: Whether the key is currently valid
/// - `last_used_at`: Updated after each successful verification
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKey {
    pub id: Uuid,

    /// Owning account; copied into every audit record.
    pub account_id: String,

    /// Display name given at issuance.
    pub name: String,

    /// Plaintext secret (legacy rows only).
    pub key: Option<String>,

    /// SHA-256 hash of the secret (64 hex characters).
    pub key_hash: Option<String>,

    /// First characters of the minted key, safe to show in listings and logs.
    pub key_prefix: String,

    /// Inactive keys are rejected during authentication. This provides a way to revoke access without deleting the record.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub last_used_at: Option<DateTime<Utc>>,
}

/// Values for a key row about to be inserted.
#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub account_id: String,
    pub name: String,
    pub key_hash: String,
    pub key_prefix: String,
}

/// Request body for minting a new API key.
///
/// # JSON Example
///
/// ```json
/// {
///   "account_id": "acct_42",
///   "name": "Front desk scanner"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct GenerateKeyRequest {
    pub account_id: String,
    pub name: String,
}

/// Response body for a freshly minted key.
///
/// `api_key` is the only place the plaintext secret is ever returned.
#[derive(Debug, Serialize)]
pub struct GenerateKeyResponse {
    pub api_key: String,
    pub key_id: Uuid,
    pub key_prefix: String,
    pub account_id: String,
    pub name: String,
}

impl GenerateKeyResponse {
    pub fn new(raw_key: String, record: ApiKey) -> Self {
        Self {
            api_key: raw_key,
            key_id: record.id,
            key_prefix: record.key_prefix,
            account_id: record.account_id,
            name: record.name,
        }
    }
}
