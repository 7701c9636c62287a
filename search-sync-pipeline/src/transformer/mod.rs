//! Transformer module for the sync pipeline.
//!
//! Turns extracted records into index documents and carries the watermark
//! commit that must only happen once every document has been consumed.

use std::sync::Arc;

use search_sync_shared::{ExtractedRecord, IndexDocument, Watermark};
use tracing::{info, warn};

use crate::errors::SyncError;
use crate::state::WatermarkStore;

/// Transformer that wraps a batch of records into a [`TransformStream`].
pub struct Transformer {
    watermarks: WatermarkStore,
}

impl Transformer {
    /// Create a new transformer committing to the given store.
    pub fn new(watermarks: WatermarkStore) -> Self {
        Self { watermarks }
    }

    /// Wrap `records`, extracted after `since`, into a lazy document stream.
    pub fn transform(
        &self,
        entity_type: &str,
        since: Watermark,
        records: Vec<ExtractedRecord>,
    ) -> TransformStream {
        info!(entity_type = %entity_type, count = records.len(), "About to transform data for index");

        TransformStream {
            entity_type: entity_type.to_string(),
            since,
            records: Arc::from(records),
            position: 0,
            max_seen: None,
            watermarks: self.watermarks.clone(),
        }
    }
}

/// Lazy sequence of index documents.
///
/// Yields each record's document unchanged and tracks the largest
/// modification timestamp it has handed out. [`TransformStream::commit`]
/// persists that timestamp, but only once the stream is drained.
///
/// Cloning yields an independent stream over the same records starting from
/// the clone's position, which is how a failed load replays its batch.
#[derive(Clone)]
pub struct TransformStream {
    entity_type: String,
    since: Watermark,
    records: Arc<[ExtractedRecord]>,
    position: usize,
    max_seen: Option<Watermark>,
    watermarks: WatermarkStore,
}

impl TransformStream {
    /// Total number of documents in the stream.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the stream has no documents at all.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether every document has been pulled.
    pub fn is_drained(&self) -> bool {
        self.position >= self.records.len()
    }

    /// Largest modification timestamp pulled so far.
    pub fn max_seen(&self) -> Option<Watermark> {
        self.max_seen
    }

    /// Persist the tracked maximum as the new watermark.
    ///
    /// Commits nothing if the stream was not fully drained, if it was empty,
    /// or if the maximum does not move past the watermark the batch was
    /// extracted from. Returns the committed watermark, if any.
    pub async fn commit(self) -> Result<Option<Watermark>, SyncError> {
        if !self.is_drained() {
            warn!(
                entity_type = %self.entity_type,
                consumed = self.position,
                total = self.records.len(),
                "Stream not fully consumed, watermark left unchanged"
            );
            return Ok(None);
        }

        match self.max_seen {
            Some(max) if max > self.since => {
                self.watermarks.save(&self.entity_type, &max).await?;
                info!(entity_type = %self.entity_type, watermark = %max, "Committed watermark");
                Ok(Some(max))
            }
            _ => Ok(None),
        }
    }
}

impl Iterator for TransformStream {
    type Item = IndexDocument;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.get(self.position)?;
        self.position += 1;
        self.max_seen = Some(match self.max_seen {
            Some(max) => max.max(record.modified_at),
            None => record.modified_at,
        });
        Some(record.to_document())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.records.len().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

impl std::fmt::Debug for TransformStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformStream")
            .field("entity_type", &self.entity_type)
            .field("since", &self.since)
            .field("position", &self.position)
            .field("len", &self.records.len())
            .field("max_seen", &self.max_seen)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use chrono::{TimeZone, Utc};
    use search_sync_repository::memory::MemoryStateStore;
    use serde_json::json;
    use std::time::Duration;
    use uuid::Uuid;

    fn at(hour: u32) -> Watermark {
        Watermark::new(Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap())
    }

    fn record(hour: u32) -> ExtractedRecord {
        ExtractedRecord {
            id: Uuid::new_v4(),
            body: json!({"hour": hour}),
            modified_at: at(hour),
        }
    }

    fn transformer(memory: &MemoryStateStore) -> Transformer {
        Transformer::new(WatermarkStore::new(
            Arc::new(memory.clone()),
            RetryPolicy::new(2, Duration::from_secs(1), Duration::ZERO),
        ))
    }

    #[test]
    fn test_yields_records_unchanged() {
        let memory = MemoryStateStore::new();
        let records = vec![record(1), record(2)];
        let expected: Vec<IndexDocument> = records.iter().map(|r| r.to_document()).collect();

        let docs: Vec<IndexDocument> = transformer(&memory)
            .transform("movies", Watermark::earliest(), records)
            .collect();

        assert_eq!(docs, expected);
    }

    #[tokio::test]
    async fn test_commits_maximum_after_drain() {
        let memory = MemoryStateStore::new();
        let mut stream =
            transformer(&memory).transform("movies", Watermark::earliest(), vec![record(1), record(3), record(2)]);

        assert_eq!(stream.by_ref().count(), 3);
        assert_eq!(stream.max_seen(), Some(at(3)));
        let committed = stream.commit().await.unwrap();

        assert_eq!(committed, Some(at(3)));
        assert_eq!(
            memory.value("last_updated_in_movies").as_deref(),
            Some(at(3).to_string().as_str())
        );
    }

    #[tokio::test]
    async fn test_partial_consumption_does_not_commit() {
        let memory = MemoryStateStore::new();
        let mut stream =
            transformer(&memory).transform("movies", Watermark::earliest(), vec![record(1), record(2)]);

        assert!(stream.next().is_some());
        assert!(!stream.is_drained());
        assert_eq!(stream.max_seen(), Some(at(1)));
        assert_eq!(stream.commit().await.unwrap(), None);

        assert_eq!(memory.set_calls(), 0);
        assert!(memory.value("last_updated_in_movies").is_none());
    }

    #[tokio::test]
    async fn test_empty_stream_commits_nothing() {
        let memory = MemoryStateStore::new();
        let stream = transformer(&memory).transform("movies", at(5), Vec::new());

        assert!(stream.is_drained());
        assert_eq!(stream.commit().await.unwrap(), None);
        assert_eq!(memory.set_calls(), 0);
    }

    #[tokio::test]
    async fn test_never_moves_watermark_backwards() {
        let memory = MemoryStateStore::new();
        let mut stream = transformer(&memory).transform("movies", at(5), vec![record(4)]);

        stream.by_ref().for_each(drop);
        assert_eq!(stream.commit().await.unwrap(), None);
        assert_eq!(memory.set_calls(), 0);
    }

    #[test]
    fn test_clone_replays_from_start() {
        let memory = MemoryStateStore::new();
        let original =
            transformer(&memory).transform("movies", Watermark::earliest(), vec![record(1), record(2)]);

        let mut first = original.clone();
        first.next();
        let second = original.clone();

        assert_eq!(first.size_hint(), (1, Some(1)));
        assert_eq!(second.count(), 2);
    }
}
