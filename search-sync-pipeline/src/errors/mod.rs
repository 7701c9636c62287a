//! Error types for the sync pipeline.
//!
//! Every failure is classified by kind rather than by where it came from:
//!
//! - retryable: transient infrastructure errors, retried with backoff
//! - skippable: an unsupported entity type, logged and skipped for the cycle
//! - fatal: everything else, including exhausted retries and malformed rows

use search_sync_repository::{IndexError, SourceError, StateError};
use thiserror::Error;

/// Errors that can occur in the sync pipeline.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Error from the relational source.
    #[error("Source error: {0}")]
    Source(SourceError),

    /// Error from the search index.
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// Error from the watermark state store.
    #[error("State store error: {0}")]
    State(#[from] StateError),

    /// A retryable operation kept failing until the attempt budget ran out.
    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<SyncError>,
    },

    /// No registry entry exists for the requested entity type.
    #[error("Unsupported entity type: {0}")]
    UnsupportedEntityType(String),

    /// A source row or stored value does not have the expected shape.
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl SyncError {
    /// Create an unsupported entity type error.
    pub fn unsupported(entity_type: impl Into<String>) -> Self {
        Self::UnsupportedEntityType(entity_type.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Whether the failed operation may succeed if attempted again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Source(e) => e.is_transient(),
            Self::Index(e) => e.is_transient(),
            Self::State(e) => e.is_transient(),
            Self::RetryExhausted { .. }
            | Self::UnsupportedEntityType(_)
            | Self::ValidationError(_) => false,
        }
    }

    /// Whether the orchestrator may skip the entity type and carry on.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::UnsupportedEntityType(_))
    }
}

impl From<SourceError> for SyncError {
    fn from(err: SourceError) -> Self {
        match err {
            // A row that cannot be decoded is a shape mismatch, not an outage
            SourceError::DecodeError(msg) => Self::ValidationError(msg),
            other => Self::Source(other),
        }
    }
}
