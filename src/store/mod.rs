//! Persistence seams for the two tables the service touches.
//!
//! Handlers and services only see these traits; `postgres::PgStore` is the
//! production implementation.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    api_key::{ApiKey, NewApiKey},
    ocr_job::NewOcrJob,
};

pub mod postgres;

pub use postgres::PgStore;

/// Lookup and maintenance of `api_keys` rows.
///
/// Both finders only return rows with `is_active = true`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_active_by_plaintext(&self, key: &str) -> Result<Option<ApiKey>, sqlx::Error>;
    async fn find_active_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, sqlx::Error>;
    async fn touch_last_used(&self, id: Uuid) -> Result<(), sqlx::Error>;
    async fn insert_key(&self, key: NewApiKey) -> Result<ApiKey, sqlx::Error>;
    /// Cheapest possible read used by the health probe.
    async fn ping(&self) -> Result<(), sqlx::Error>;
}

/// Append-only audit log of scan jobs.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert_job(&self, job: &NewOcrJob) -> Result<(), sqlx::Error>;
}
