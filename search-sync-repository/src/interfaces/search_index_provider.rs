//! Search index provider trait definitions.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (OpenSearch, Elasticsearch, in-memory).

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::IndexError;
use crate::types::BulkSummary;
use search_sync_shared::IndexDocument;

/// Opens sessions against the search index.
#[async_trait]
pub trait IndexConnector: Send + Sync {
    /// Open a new session.
    async fn connect(&self) -> Result<Box<dyn IndexSession>, IndexError>;
}

/// Abstracts the underlying search index implementation (OpenSearch, Elasticsearch, etc.).
///
/// All methods return `Result<T, IndexError>` for consistent error handling across
/// different backend implementations.
#[async_trait]
pub trait IndexSession: Send + Sync {
    /// Create the index with the given settings and mappings unless it already exists.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the index was created
    /// * `Ok(false)` - If the index already existed
    /// * `Err(IndexError)` - If the check or creation fails
    async fn ensure_index(&self, index: &str, settings: &Value) -> Result<bool, IndexError>;

    /// Upsert documents in a single bulk request.
    ///
    /// Each document is written under its own `id`, replacing any existing
    /// document with that id.
    ///
    /// # Returns
    ///
    /// * `Ok(BulkSummary)` - Per-item outcome of the request
    /// * `Err(IndexError)` - If the request itself fails
    async fn bulk_upsert(
        &self,
        index: &str,
        documents: &[IndexDocument],
    ) -> Result<BulkSummary, IndexError>;

    /// Check if the search engine is healthy and reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the search engine is healthy
    /// * `Ok(false)` - If the search engine is unhealthy
    /// * `Err(IndexError)` - If the health check fails to execute
    async fn health_check(&self) -> Result<bool, IndexError>;

    /// Release the session.
    async fn close(self: Box<Self>);
}
