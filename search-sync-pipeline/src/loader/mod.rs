//! Loader module for the sync pipeline.
//!
//! Writes transformed documents into the search index in bulk batches and
//! commits the watermark once the whole stream has been written.

use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::SyncError;
use crate::registry::EntityRegistry;
use crate::retry::RetryPolicy;
use crate::transformer::TransformStream;
use search_sync_repository::{IndexConnector, IndexError, IndexSession};
use search_sync_shared::IndexDocument;

/// Loader that upserts documents into the search index.
///
/// The loader is responsible for:
/// - Batching documents into bulk requests keyed by document id
/// - Retrying the whole load when the index is unavailable
/// - Committing the watermark after the last batch was written
pub struct SearchLoader {
    index: Arc<dyn IndexConnector>,
    registry: Arc<EntityRegistry>,
    retry: RetryPolicy,
}

impl SearchLoader {
    /// Create a new search loader.
    pub fn new(
        index: Arc<dyn IndexConnector>,
        registry: Arc<EntityRegistry>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            index,
            registry,
            retry,
        }
    }

    /// Load every document of `stream` into the index named `entity_type`,
    /// `batch_size` documents per bulk request.
    ///
    /// A failed attempt replays the stream from its first document. Upserts
    /// are idempotent, so documents written by the failed attempt are simply
    /// overwritten.
    ///
    /// # Returns
    ///
    /// * `Ok(count)` - Number of documents written
    /// * `Err(SyncError::RetryExhausted)` - If the index stayed unavailable
    #[instrument(skip(self, stream), fields(count = stream.len()))]
    pub async fn load(
        &self,
        entity_type: &str,
        stream: TransformStream,
        batch_size: usize,
    ) -> Result<usize, SyncError> {
        info!("About to load data into index");

        let written = self
            .retry
            .run("bulk load", || self.load_once(entity_type, stream.clone(), batch_size))
            .await?;

        if written == 0 {
            info!("No updates for index");
        } else {
            info!(count = written, "{} documents saved to index", written);
        }

        Ok(written)
    }

    /// One connect-write-close pass over the stream, followed by the commit.
    async fn load_once(
        &self,
        index: &str,
        mut stream: TransformStream,
        batch_size: usize,
    ) -> Result<usize, SyncError> {
        let session = self.index.connect().await?;
        let result = Self::write_batches(session.as_ref(), index, &mut stream, batch_size).await;
        session.close().await;
        let written = result?;

        stream.commit().await?;
        Ok(written)
    }

    async fn write_batches(
        session: &dyn IndexSession,
        index: &str,
        stream: &mut TransformStream,
        batch_size: usize,
    ) -> Result<usize, SyncError> {
        let mut written = 0;

        loop {
            let batch: Vec<IndexDocument> = stream.by_ref().take(batch_size.max(1)).collect();
            if batch.is_empty() {
                return Ok(written);
            }

            let summary = session.bulk_upsert(index, &batch).await?;
            if summary.failed > 0 {
                let first_error = summary.first_error().unwrap_or("unknown error").to_string();
                error!(
                    failed = summary.failed,
                    total = summary.total,
                    first_error = %first_error,
                    "Bulk request partially failed"
                );
                return Err(IndexError::bulk_operation(summary.failed, summary.total, first_error).into());
            }

            written += batch.len();
            debug!(batch = batch.len(), written, "Wrote batch");
        }
    }

    /// Create the index for `entity_type` with its settings and mappings if it
    /// does not exist yet.
    ///
    /// Returns whether the index was created.
    #[instrument(skip(self))]
    pub async fn ensure_index(&self, entity_type: &str) -> Result<bool, SyncError> {
        let definition = self.registry.resolve(entity_type)?;
        let settings = (definition.index_settings)();

        let created = self
            .retry
            .run("ensure index", || async {
                let session = self.index.connect().await?;
                let result = Self::create_if_missing(session.as_ref(), definition.name, &settings).await;
                session.close().await;
                result
            })
            .await?;

        if created {
            info!("Created index");
        } else {
            debug!("Index already exists");
        }
        Ok(created)
    }

    async fn create_if_missing(
        session: &dyn IndexSession,
        index: &str,
        settings: &serde_json::Value,
    ) -> Result<bool, SyncError> {
        if !session.health_check().await? {
            warn!("Search cluster reports red status");
            return Err(IndexError::UnavailableError("cluster status is red".to_string()).into());
        }
        Ok(session.ensure_index(index, settings).await?)
    }
}
