//! # Search Sync Shared
//!
//! Shared types for the Postgres to search index synchronizer.
//!
//! This crate holds the data model that flows through the pipeline:
//!
//! - [`Watermark`]: the persisted cursor marking how far a type has been synced
//! - [`ExtractedRecord`]: a validated aggregate row and its modification time
//! - [`IndexDocument`]: the index-ready document keyed by source identity
//! - Document shapes for each synchronized entity type

mod documents;
mod record;
mod watermark;

pub use documents::{
    FilmWorkDocument, GenreDocument, PersonDocument, PersonFilm, PersonRef, SearchDocument,
};
pub use record::{ExtractedRecord, IndexDocument};
pub use watermark::{Watermark, WatermarkParseError};
