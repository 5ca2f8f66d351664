//! OCR engine plumbing: backends, the per-region registry, and output normalization.

pub mod engine;
pub mod normalize;
pub mod registry;

pub use engine::{ConfiguredEngineFactory, EngineError, EngineFactory, RecognitionEngine};
pub use registry::EngineRegistry;
