//! Test doubles shared by unit and router tests.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    models::{
        api_key::{ApiKey, NewApiKey},
        ocr_job::{NewOcrJob, Region},
    },
    ocr::{EngineError, EngineFactory, RecognitionEngine},
    services::credential_service::hash_api_key,
    store::{CredentialStore, JobStore},
};

/// In-memory `api_keys` + `ocr_jobs` with switchable failures.
#[derive(Default)]
pub struct MemoryStore {
    keys: Mutex<Vec<ApiKey>>,
    jobs: Mutex<Vec<NewOcrJob>>,
    unavailable: AtomicBool,
    fail_touches: AtomicBool,
    fail_job_inserts: AtomicBool,
    plaintext_lookups: AtomicUsize,
    hash_lookups: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_key(&self, account_id: &str, key: Option<String>, key_hash: Option<String>, active: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.keys.lock().unwrap().push(ApiKey {
            id,
            account_id: account_id.to_string(),
            name: "test key".to_string(),
            key,
            key_hash,
            key_prefix: String::new(),
            is_active: active,
            created_at: Utc::now(),
            last_used_at: None,
        });
        id
    }

    pub fn add_plaintext_key(&self, account_id: &str, key: &str, active: bool) -> Uuid {
        self.add_key(account_id, Some(key.to_string()), None, active)
    }

    pub fn add_hashed_key(&self, account_id: &str, key: &str, active: bool) -> Uuid {
        self.add_key(account_id, None, Some(hash_api_key(key)), active)
    }

    pub fn key(&self, id: Uuid) -> Option<ApiKey> {
        self.keys.lock().unwrap().iter().find(|k| k.id == id).cloned()
    }

    pub fn jobs(&self) -> Vec<NewOcrJob> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn fail_touches(&self, fail: bool) {
        self.fail_touches.store(fail, Ordering::SeqCst);
    }

    pub fn fail_job_inserts(&self, fail: bool) {
        self.fail_job_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn plaintext_lookups(&self) -> usize {
        self.plaintext_lookups.load(Ordering::SeqCst)
    }

    pub fn hash_lookups(&self) -> usize {
        self.hash_lookups.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), sqlx::Error> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(sqlx::Error::PoolTimedOut)
        } else {
            Ok(())
        }
    }

    fn find_active(&self, matches: impl Fn(&ApiKey) -> bool) -> Option<ApiKey> {
        self.keys
            .lock()
            .unwrap()
            .iter()
            .find(|k| k.is_active && matches(k))
            .cloned()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_active_by_plaintext(&self, key: &str) -> Result<Option<ApiKey>, sqlx::Error> {
        self.plaintext_lookups.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.find_active(|k| k.key.as_deref() == Some(key)))
    }

    async fn find_active_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, sqlx::Error> {
        self.hash_lookups.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.find_active(|k| k.key_hash.as_deref() == Some(key_hash)))
    }

    async fn touch_last_used(&self, id: Uuid) -> Result<(), sqlx::Error> {
        self.check_available()?;
        if self.fail_touches.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolClosed);
        }
        if let Some(key) = self.keys.lock().unwrap().iter_mut().find(|k| k.id == id) {
            key.last_used_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn insert_key(&self, key: NewApiKey) -> Result<ApiKey, sqlx::Error> {
        self.check_available()?;
        let record = ApiKey {
            id: Uuid::new_v4(),
            account_id: key.account_id,
            name: key.name,
            key: None,
            key_hash: Some(key.key_hash),
            key_prefix: key.key_prefix,
            is_active: true,
            created_at: Utc::now(),
            last_used_at: None,
        };
        self.keys.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        self.check_available()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn insert_job(&self, job: &NewOcrJob) -> Result<(), sqlx::Error> {
        self.check_available()?;
        if self.fail_job_inserts.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolClosed);
        }
        self.jobs.lock().unwrap().push(job.clone());
        Ok(())
    }
}

/// Engine returning a fixed result and recording the paths it was given.
pub struct ScriptedEngine {
    outcome: Result<Value, String>,
    delay: Option<Duration>,
    seen: Mutex<Vec<PathBuf>>,
    saw_existing_file: AtomicBool,
}

impl ScriptedEngine {
    pub fn returning(raw: Value) -> Self {
        Self::with_outcome(Ok(raw))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_outcome(Err(message.to_string()))
    }

    fn with_outcome(outcome: Result<Value, String>) -> Self {
        Self {
            outcome,
            delay: None,
            seen: Mutex::new(Vec::new()),
            saw_existing_file: AtomicBool::new(false),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn seen_paths(&self) -> Vec<PathBuf> {
        self.seen.lock().unwrap().clone()
    }

    /// Whether the image file existed while the engine was running.
    pub fn saw_existing_file(&self) -> bool {
        self.saw_existing_file.load(Ordering::SeqCst)
    }
}

impl RecognitionEngine for ScriptedEngine {
    fn recognize(&self, image_path: &Path) -> Result<Value, EngineError> {
        self.seen.lock().unwrap().push(image_path.to_path_buf());
        if image_path.exists() {
            self.saw_existing_file.store(true, Ordering::SeqCst);
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.outcome.clone().map_err(EngineError::Failed)
    }
}

/// Factory handing out one shared engine and counting constructions per region.
pub struct CountingFactory {
    engine: Arc<ScriptedEngine>,
    delay: Option<Duration>,
    failures_left: AtomicUsize,
    created: Mutex<HashMap<Region, usize>>,
}

impl CountingFactory {
    pub fn new(engine: ScriptedEngine) -> Self {
        Self::shared(Arc::new(engine))
    }

    pub fn shared(engine: Arc<ScriptedEngine>) -> Self {
        Self {
            engine,
            delay: None,
            failures_left: AtomicUsize::new(0),
            created: Mutex::new(HashMap::new()),
        }
    }

    /// Sleep inside `create` to widen the window for racing first requests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the first `count` constructions.
    pub fn failing_first(self, count: usize) -> Self {
        self.failures_left.store(count, Ordering::SeqCst);
        self
    }

    /// Construction attempts for `region`, successful or not.
    pub fn created(&self, region: Region) -> usize {
        self.created.lock().unwrap().get(&region).copied().unwrap_or(0)
    }
}

impl EngineFactory for CountingFactory {
    fn create(&self, region: Region) -> Result<Arc<dyn RecognitionEngine>, EngineError> {
        *self.created.lock().unwrap().entry(region).or_insert(0) += 1;
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if fail {
            return Err(EngineError::Init("scripted construction failure".to_string()));
        }

        Ok(self.engine.clone())
    }
}
