//! Watermark persistence.
//!
//! Wraps a [`StateStore`] with the retry policy and the key format
//! `last_updated_in_<entity_type>`. The underlying store treats values as
//! opaque strings; parsing and staleness checks happen here and in the
//! transformer.

use std::sync::Arc;

use search_sync_repository::StateStore;
use search_sync_shared::Watermark;
use tracing::{debug, instrument};

use crate::errors::SyncError;
use crate::retry::RetryPolicy;

/// Key under which the watermark of an entity type is stored.
pub fn watermark_key(entity_type: &str) -> String {
    format!("last_updated_in_{}", entity_type)
}

/// Durable per-entity-type sync cursor.
#[derive(Clone)]
pub struct WatermarkStore {
    store: Arc<dyn StateStore>,
    retry: RetryPolicy,
}

impl WatermarkStore {
    /// Create a watermark store over the given state store.
    pub fn new(store: Arc<dyn StateStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Read a raw value, returning `default` if the key was never written.
    pub async fn get(&self, key: &str, default: &str) -> Result<String, SyncError> {
        let value = self
            .retry
            .run("watermark read", || async {
                self.store.get(key).await.map_err(SyncError::from)
            })
            .await?;

        Ok(value.unwrap_or_else(|| default.to_string()))
    }

    /// Write a raw value.
    ///
    /// Exhausting the retry budget is fatal for the caller.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), SyncError> {
        self.retry
            .run("watermark write", || async {
                self.store.set(key, value).await.map_err(SyncError::from)
            })
            .await
    }

    /// The current watermark of an entity type, or the earliest watermark on
    /// first run.
    #[instrument(skip(self))]
    pub async fn load(&self, entity_type: &str) -> Result<Watermark, SyncError> {
        let raw = self
            .get(&watermark_key(entity_type), &Watermark::earliest().to_string())
            .await?;

        let watermark = Watermark::parse(&raw).map_err(|e| SyncError::validation(e.to_string()))?;
        debug!(watermark = %watermark, "Resolved watermark");
        Ok(watermark)
    }

    /// Persist the watermark of an entity type.
    #[instrument(skip(self))]
    pub async fn save(&self, entity_type: &str, watermark: &Watermark) -> Result<(), SyncError> {
        self.set(&watermark_key(entity_type), &watermark.to_string())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use search_sync_repository::memory::MemoryStateStore;
    use std::time::Duration;

    fn store_with(memory: &MemoryStateStore, attempts: u32) -> WatermarkStore {
        WatermarkStore::new(
            Arc::new(memory.clone()),
            RetryPolicy::new(attempts, Duration::from_secs(1), Duration::ZERO),
        )
    }

    #[test]
    fn test_key_format() {
        assert_eq!(watermark_key("movies"), "last_updated_in_movies");
    }

    #[tokio::test]
    async fn test_first_run_uses_default() {
        let memory = MemoryStateStore::new();
        let store = store_with(&memory, 3);

        assert_eq!(store.get("missing", "fallback").await.unwrap(), "fallback");
        assert_eq!(store.load("movies").await.unwrap(), Watermark::earliest());
        assert!(memory.value("last_updated_in_movies").is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let memory = MemoryStateStore::new();
        let store = store_with(&memory, 3);
        let watermark = Watermark::new(Utc.with_ymd_and_hms(2023, 5, 1, 8, 0, 0).unwrap());

        store.save("genres", &watermark).await.unwrap();

        assert_eq!(
            memory.value("last_updated_in_genres").as_deref(),
            Some("2023-05-01T08:00:00.000000Z")
        );
        assert_eq!(store.load("genres").await.unwrap(), watermark);
    }

    #[tokio::test]
    async fn test_reads_values_written_in_legacy_format() {
        let memory = MemoryStateStore::new();
        memory.insert("last_updated_in_movies", "2021-06-16 20:14:09.221855+00:00");
        let store = store_with(&memory, 3);

        let watermark = store.load("movies").await.unwrap();
        assert_eq!(watermark.to_string(), "2021-06-16T20:14:09.221855Z");
    }

    #[tokio::test]
    async fn test_unparseable_value_is_a_validation_error() {
        let memory = MemoryStateStore::new();
        memory.insert("last_updated_in_movies", "not a timestamp");
        let store = store_with(&memory, 3);

        let err = store.load("movies").await.unwrap_err();
        assert!(matches!(err, SyncError::ValidationError(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_retries_transient_read_failures() {
        let memory = MemoryStateStore::new();
        memory.insert("last_updated_in_movies", "2024-01-01T00:00:00.000000Z");
        memory.fail_next_gets(2);
        let store = store_with(&memory, 3);

        let watermark = store.load("movies").await.unwrap();

        assert_eq!(watermark.to_string(), "2024-01-01T00:00:00.000000Z");
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_read_exhaustion_is_fatal() {
        let memory = MemoryStateStore::new();
        memory.insert("last_updated_in_movies", "2024-01-01T00:00:00.000000Z");
        memory.fail_next_gets(3);
        let store = store_with(&memory, 3);

        let err = store.load("movies").await.unwrap_err();

        match err {
            SyncError::RetryExhausted {
                operation,
                attempts,
                source,
            } => {
                assert_eq!(operation, "watermark read");
                assert_eq!(attempts, 3);
                assert!(matches!(*source, SyncError::State(_)));
            }
            other => panic!("expected RetryExhausted, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_retries_transient_failures() {
        let memory = MemoryStateStore::new();
        memory.fail_next_sets(2);
        let store = store_with(&memory, 3);

        store.set("k", "v").await.unwrap();

        assert_eq!(memory.set_calls(), 3);
        assert_eq!(memory.value("k").as_deref(), Some("v"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_exhaustion_propagates() {
        let memory = MemoryStateStore::new();
        memory.fail_next_sets(3);
        let store = store_with(&memory, 3);

        let err = store.set("k", "v").await.unwrap_err();

        assert!(matches!(err, SyncError::RetryExhausted { attempts: 3, .. }));
        assert!(memory.value("k").is_none());
    }
}
