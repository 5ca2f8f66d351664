//! Process-wide cache of one recognition engine per region.
//!
//! Each region owns a slot holding a `OnceLock` and a build lock.
//! Construction runs entirely inside a blocking task that owns the slot, so
//! a caller dropping its future (client disconnect) cannot abandon a build
//! halfway: the task finishes and stores the engine for everyone else.
//! Concurrent first requests queue on the build lock and reuse the result;
//! afterwards reads take no lock. A failed construction leaves the slot
//! empty so the next request retries. Engines are never evicted.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use super::engine::{EngineError, EngineFactory, RecognitionEngine};
use crate::models::ocr_job::Region;

#[derive(Default)]
struct EngineSlot {
    engine: OnceLock<Arc<dyn RecognitionEngine>>,
    building: Mutex<()>,
}

impl EngineSlot {
    /// Blocking. Returns the stored engine or builds it under the slot's lock.
    fn get_or_build(
        &self,
        factory: &dyn EngineFactory,
        region: Region,
    ) -> Result<Arc<dyn RecognitionEngine>, EngineError> {
        // A panicking factory poisons the lock but leaves the slot empty.
        let _building = self.building.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(engine) = self.engine.get() {
            return Ok(Arc::clone(engine));
        }

        let engine = factory.create(region)?;
        Ok(Arc::clone(self.engine.get_or_init(|| engine)))
    }
}

pub struct EngineRegistry {
    factory: Arc<dyn EngineFactory>,
    hk: Arc<EngineSlot>,
    cn: Arc<EngineSlot>,
    mo: Arc<EngineSlot>,
}

impl EngineRegistry {
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            factory,
            hk: Arc::default(),
            cn: Arc::default(),
            mo: Arc::default(),
        }
    }

    fn slot(&self, region: Region) -> &Arc<EngineSlot> {
        match region {
            Region::Hk => &self.hk,
            Region::Cn => &self.cn,
            Region::Mo => &self.mo,
        }
    }

    /// Engine bound to `region`, building it on first use.
    pub async fn get(&self, region: Region) -> Result<Arc<dyn RecognitionEngine>, EngineError> {
        let slot = self.slot(region);
        if let Some(engine) = slot.engine.get() {
            return Ok(Arc::clone(engine));
        }

        let slot = Arc::clone(slot);
        let factory = Arc::clone(&self.factory);
        // Construction may load models; keep it off the async workers.
        match tokio::task::spawn_blocking(move || slot.get_or_build(factory.as_ref(), region)).await {
            Ok(built) => built,
            Err(e) => Err(EngineError::Init(format!(
                "engine construction panicked: {e}"
            ))),
        }
    }

    /// Whether the engine for `region` has been built.
    pub fn is_initialized(&self, region: Region) -> bool {
        self.slot(region).engine.get().is_some()
    }

    /// Build every region's engine up front.
    pub async fn warm_up(&self) -> Result<(), EngineError> {
        for region in Region::ALL {
            self.get(region).await?;
            tracing::info!(%region, "OCR engine ready");
        }
        Ok(())
    }
}
