//! PostgreSQL implementation of the store traits.

use async_trait::async_trait;
use uuid::Uuid;

use super::{CredentialStore, JobStore};
use crate::{
    db::DbPool,
    models::{
        api_key::{ApiKey, NewApiKey},
        ocr_job::NewOcrJob,
    },
};

const API_KEY_COLUMNS: &str =
    "id, account_id, name, key, key_hash, key_prefix, is_active, created_at, last_used_at";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_active_by_plaintext(&self, key: &str) -> Result<Option<ApiKey>, sqlx::Error> {
        sqlx::query_as::<_, ApiKey>(&format!(
            "SELECT {API_KEY_COLUMNS} FROM api_keys WHERE key = $1 AND is_active = true LIMIT 1"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_active_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, sqlx::Error> {
        sqlx::query_as::<_, ApiKey>(&format!(
            "SELECT {API_KEY_COLUMNS} FROM api_keys WHERE key_hash = $1 AND is_active = true LIMIT 1"
        ))
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await
    }

    async fn touch_last_used(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE api_keys SET last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_key(&self, key: NewApiKey) -> Result<ApiKey, sqlx::Error> {
        sqlx::query_as::<_, ApiKey>(&format!(
            r#"
            INSERT INTO api_keys (account_id, name, key_hash, key_prefix, is_active)
            VALUES ($1, $2, $3, $4, true)
            RETURNING {API_KEY_COLUMNS}
            "#
        ))
        .bind(key.account_id)
        .bind(key.name)
        .bind(key.key_hash)
        .bind(key.key_prefix)
        .fetch_one(&self.pool)
        .await
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT id FROM api_keys LIMIT 1")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn insert_job(&self, job: &NewOcrJob) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO ocr_jobs (
                id,
                account_id,
                api_key_id,
                filename,
                file_size,
                region,
                status,
                total_lines,
                raw_text,
                structured_data,
                confidence_avg,
                processing_time_ms,
                error_message
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(job.id)
        .bind(&job.account_id)
        .bind(job.api_key_id)
        .bind(&job.filename)
        .bind(job.file_size)
        .bind(job.region.code())
        .bind(job.status.as_str())
        .bind(job.total_lines)
        .bind(&job.raw_text)
        .bind(job.structured_data())
        .bind(job.confidence_avg)
        .bind(job.processing_time_ms)
        .bind(&job.error_message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
