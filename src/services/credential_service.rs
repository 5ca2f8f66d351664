//! API key verification and issuance.
//!
//! # Verification order
//!
//! 1. Equality match against the plaintext `key` column (legacy rows)
//! 2. SHA-256 hex digest match against the `key_hash` column
//!
//! Only active keys match. A store outage is reported as a separate error
//! from an unknown key so the two can be told apart in logs, even though
//! callers deny both the same way.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::api_key::{ApiKey, GenerateKeyRequest, GenerateKeyResponse, NewApiKey},
    store::CredentialStore,
};

/// Prefix of every minted key.
const KEY_PREFIX: &str = "br";

/// Number of leading key characters stored for display.
const DISPLAY_PREFIX_LEN: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("API key not found or inactive")]
    NotFound,

    #[error("credential store unavailable: {0}")]
    Store(#[from] sqlx::Error),
}

/// SHA-256 hex digest used for stored key hashes.
pub fn hash_api_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Short, log-safe prefix of a presented key.
pub fn key_preview(key: &str) -> &str {
    match key.char_indices().nth(DISPLAY_PREFIX_LEN) {
        Some((idx, _)) => &key[..idx],
        None => key,
    }
}

/// Verify a presented key against the store.
///
/// On success the key's `last_used_at` is bumped on a detached task; that
/// write can fail without affecting the result.
pub async fn verify(
    store: &Arc<dyn CredentialStore>,
    presented_key: &str,
) -> Result<ApiKey, CredentialError> {
    if let Some(record) = store.find_active_by_plaintext(presented_key).await? {
        tracing::debug!(key_id = %record.id, "API key verified (plaintext)");
        touch_last_used(store, record.id);
        return Ok(record);
    }

    let key_hash = hash_api_key(presented_key);
    match store.find_active_by_hash(&key_hash).await? {
        Some(record) => {
            tracing::debug!(key_id = %record.id, "API key verified (hash)");
            touch_last_used(store, record.id);
            Ok(record)
        }
        None => Err(CredentialError::NotFound),
    }
}

fn touch_last_used(store: &Arc<dyn CredentialStore>, key_id: Uuid) {
    let store = Arc::clone(store);
    tokio::spawn(async move {
        if let Err(e) = store.touch_last_used(key_id).await {
            tracing::warn!(%key_id, error = %e, "failed to update API key last_used_at");
        }
    });
}

/// Mint a new key for an account.
///
/// # Process
///
/// 1. Validate the request fields
/// 2. Generate `br` + 40 hex characters (20 random bytes)
/// 3. Store the SHA-256 hash and display prefix only
/// 4. Return the plaintext key (the only time it is shown)
pub async fn issue_key(
    store: &Arc<dyn CredentialStore>,
    request: GenerateKeyRequest,
) -> Result<GenerateKeyResponse, AppError> {
    let account_id = request.account_id.trim();
    let name = request.name.trim();
    if account_id.is_empty() || name.is_empty() {
        return Err(AppError::InvalidRequest(
            "account_id and name are required".to_string(),
        ));
    }

    let raw_key = generate_key();
    let record = store
        .insert_key(NewApiKey {
            account_id: account_id.to_string(),
            name: name.to_string(),
            key_hash: hash_api_key(&raw_key),
            key_prefix: key_preview(&raw_key).to_string(),
        })
        .await?;

    tracing::info!(key_id = %record.id, account_id = %record.account_id, "issued API key");
    Ok(GenerateKeyResponse::new(raw_key, record))
}

fn generate_key() -> String {
    let bytes: [u8; 20] = rand::random();
    format!("{KEY_PREFIX}{}", hex::encode(bytes))
}
