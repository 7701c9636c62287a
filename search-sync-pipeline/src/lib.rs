//! # Search Sync Pipeline
//!
//! This crate provides the pipeline components for copying film catalogue
//! aggregates from PostgreSQL into the search index.
//!
//! ## Architecture
//!
//! The pipeline follows the Extractor-Transformer-Loader pattern:
//!
//! 1. **Extractor**: Reads aggregates changed since the watermark
//! 2. **Transformer**: Streams them as index documents and tracks the newest timestamp
//! 3. **Loader**: Bulk upserts the documents and commits the watermark
//! 4. **Orchestrator**: Runs the pipeline for each entity type on an interval

pub mod errors;
pub mod extractor;
pub mod loader;
pub mod orchestrator;
pub mod registry;
pub mod retry;
pub mod state;
pub mod transformer;

pub use errors::SyncError;
pub use extractor::Extractor;
pub use loader::SearchLoader;
pub use orchestrator::{CycleReport, Orchestrator, OrchestratorConfig, SyncOutcome};
pub use registry::{EntityDefinition, EntityRegistry};
pub use retry::RetryPolicy;
pub use state::{watermark_key, WatermarkStore};
pub use transformer::{TransformStream, Transformer};
