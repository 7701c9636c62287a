//! In-memory implementations of the repository interfaces.
//!
//! Used by tests across the workspace. Each double can be told to fail a
//! number of upcoming calls so retry and crash-recovery paths can be driven
//! deterministically. Handles are cheap to clone and share state.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::{IndexError, SourceError, StateError};
use crate::interfaces::{IndexConnector, IndexSession, SourceConnector, SourceSession, StateStore};
use crate::types::{AggregateQuery, AggregateRow, BulkSummary};
use search_sync_shared::IndexDocument;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Decrement a failure budget, returning whether a failure should fire.
fn take_failure(budget: &AtomicUsize) -> bool {
    budget
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SourceState {
    rows: Mutex<HashMap<String, Vec<AggregateRow>>>,
    connect_failures: AtomicUsize,
    connects: AtomicUsize,
    open_sessions: AtomicUsize,
}

/// Relational source double.
///
/// Emulates the query contract: rows of the query's entity type with
/// `modified_at` strictly after the bound, ascending by `modified_at`.
#[derive(Clone, Default)]
pub struct MemorySource {
    inner: Arc<SourceState>,
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an aggregate row for an entity type.
    pub fn insert(&self, entity_type: &str, row: AggregateRow) {
        lock(&self.inner.rows)
            .entry(entity_type.to_string())
            .or_default()
            .push(row);
    }

    /// Make the next `n` connection attempts fail with a connection error.
    pub fn fail_next_connects(&self, n: usize) {
        self.inner.connect_failures.store(n, Ordering::SeqCst);
    }

    /// Number of connection attempts so far.
    pub fn connect_count(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    /// Number of sessions opened and not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.inner.open_sessions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceConnector for MemorySource {
    async fn connect(&self) -> Result<Box<dyn SourceSession>, SourceError> {
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.inner.connect_failures) {
            return Err(SourceError::connection("connection refused"));
        }

        self.inner.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySourceSession {
            inner: self.inner.clone(),
        }))
    }
}

struct MemorySourceSession {
    inner: Arc<SourceState>,
}

#[async_trait]
impl SourceSession for MemorySourceSession {
    async fn fetch_aggregates(
        &mut self,
        query: &AggregateQuery,
    ) -> Result<Vec<AggregateRow>, SourceError> {
        let mut rows: Vec<AggregateRow> = lock(&self.inner.rows)
            .get(&query.entity_type)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row.modified_at > query.modified_after)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        rows.sort_by_key(|row| row.modified_at);
        Ok(rows)
    }

    async fn close(self: Box<Self>) {
        self.inner.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Search index
// ---------------------------------------------------------------------------

struct BulkFault {
    /// First 1-based bulk call that fails.
    from_call: usize,
    /// Remaining failures, `None` for unlimited.
    remaining: Option<usize>,
    error: IndexError,
}

#[derive(Default)]
struct IndexState {
    indices: Mutex<HashMap<String, BTreeMap<String, Value>>>,
    settings: Mutex<HashMap<String, Value>>,
    fault: Mutex<Option<BulkFault>>,
    bulk_calls: AtomicUsize,
    open_sessions: AtomicUsize,
}

/// Search index double keeping documents per index, keyed by id.
#[derive(Clone, Default)]
pub struct MemoryIndex {
    inner: Arc<IndexState>,
}

impl MemoryIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// All documents of an index, ordered by id.
    pub fn documents(&self, index: &str) -> BTreeMap<String, Value> {
        lock(&self.inner.indices)
            .get(index)
            .cloned()
            .unwrap_or_default()
    }

    /// One document by id.
    pub fn document(&self, index: &str, id: &str) -> Option<Value> {
        lock(&self.inner.indices)
            .get(index)
            .and_then(|docs| docs.get(id).cloned())
    }

    /// Settings the index was created with, if it was created.
    pub fn settings(&self, index: &str) -> Option<Value> {
        lock(&self.inner.settings).get(index).cloned()
    }

    /// Number of bulk requests received, failed ones included.
    pub fn bulk_calls(&self) -> usize {
        self.inner.bulk_calls.load(Ordering::SeqCst)
    }

    /// Number of sessions opened and not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.inner.open_sessions.load(Ordering::SeqCst)
    }

    /// Make the next `n` bulk requests fail with a connection error.
    pub fn fail_next_bulk(&self, n: usize) {
        *lock(&self.inner.fault) = Some(BulkFault {
            from_call: self.bulk_calls() + 1,
            remaining: Some(n),
            error: IndexError::connection("connection reset by peer"),
        });
    }

    /// Make every bulk request from the `call`-th onwards (1-based, counted
    /// from creation) fail with `error` until [`MemoryIndex::clear_failures`].
    pub fn fail_bulk_from_call(&self, call: usize, error: IndexError) {
        *lock(&self.inner.fault) = Some(BulkFault {
            from_call: call,
            remaining: None,
            error,
        });
    }

    /// Remove any configured failure.
    pub fn clear_failures(&self) {
        *lock(&self.inner.fault) = None;
    }

    fn injected_failure(&self, call: usize) -> Option<IndexError> {
        let mut fault = lock(&self.inner.fault);
        let active = fault.as_mut()?;
        if call < active.from_call {
            return None;
        }
        match active.remaining.as_mut() {
            Some(0) => None,
            Some(n) => {
                *n -= 1;
                Some(active.error.clone())
            }
            None => Some(active.error.clone()),
        }
    }
}

#[async_trait]
impl IndexConnector for MemoryIndex {
    async fn connect(&self) -> Result<Box<dyn IndexSession>, IndexError> {
        self.inner.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl IndexSession for MemoryIndex {
    async fn ensure_index(&self, index: &str, settings: &Value) -> Result<bool, IndexError> {
        let mut created = lock(&self.inner.settings);
        if created.contains_key(index) {
            return Ok(false);
        }
        created.insert(index.to_string(), settings.clone());
        lock(&self.inner.indices).entry(index.to_string()).or_default();
        Ok(true)
    }

    async fn bulk_upsert(
        &self,
        index: &str,
        documents: &[IndexDocument],
    ) -> Result<BulkSummary, IndexError> {
        let call = self.inner.bulk_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(error) = self.injected_failure(call) {
            return Err(error);
        }

        let mut indices = lock(&self.inner.indices);
        let docs = indices.entry(index.to_string()).or_default();
        for doc in documents {
            docs.insert(doc.id.clone(), doc.body.clone());
        }

        Ok(BulkSummary::all_succeeded(
            documents.iter().map(|d| d.id.clone()),
        ))
    }

    async fn health_check(&self) -> Result<bool, IndexError> {
        Ok(true)
    }

    async fn close(self: Box<Self>) {
        self.inner.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// State store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreState {
    values: Mutex<HashMap<String, String>>,
    get_failures: AtomicUsize,
    set_failures: AtomicUsize,
    set_calls: AtomicUsize,
}

/// State store double.
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<StoreState>,
}

impl MemoryStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a key.
    pub fn value(&self, key: &str) -> Option<String> {
        lock(&self.inner.values).get(key).cloned()
    }

    /// Seed a value without counting it as a write.
    pub fn insert(&self, key: &str, value: &str) {
        lock(&self.inner.values).insert(key.to_string(), value.to_string());
    }

    /// Make the next `n` reads fail with a connection error.
    pub fn fail_next_gets(&self, n: usize) {
        self.inner.get_failures.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` writes fail with a connection error.
    pub fn fail_next_sets(&self, n: usize) {
        self.inner.set_failures.store(n, Ordering::SeqCst);
    }

    /// Number of write attempts so far, failed ones included.
    pub fn set_calls(&self) -> usize {
        self.inner.set_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StateError> {
        if take_failure(&self.inner.get_failures) {
            return Err(StateError::connection("connection refused"));
        }
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StateError> {
        self.inner.set_calls.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.inner.set_failures) {
            return Err(StateError::connection("connection refused"));
        }
        self.insert(key, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[tokio::test]
    async fn test_source_filters_and_orders_rows() {
        let source = MemorySource::new();
        let t = |h| Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap();
        source.insert("movies", AggregateRow::new(json!({"n": 3}), t(3)));
        source.insert("movies", AggregateRow::new(json!({"n": 1}), t(1)));
        source.insert("movies", AggregateRow::new(json!({"n": 2}), t(2)));
        source.insert("genres", AggregateRow::new(json!({"n": 9}), t(9)));

        let mut session = source.connect().await.unwrap();
        assert_eq!(source.open_sessions(), 1);

        let rows = session
            .fetch_aggregates(&AggregateQuery::new("movies", "", t(1)))
            .await
            .unwrap();
        session.close().await;

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].document["n"], 2);
        assert_eq!(rows[1].document["n"], 3);
        assert_eq!(source.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_index_upsert_overwrites_by_id() {
        let index = MemoryIndex::new();
        let doc = |title: &str| IndexDocument {
            id: "a".to_string(),
            body: json!({"title": title}),
        };

        index.bulk_upsert("movies", &[doc("first")]).await.unwrap();
        index.bulk_upsert("movies", &[doc("second")]).await.unwrap();

        let docs = index.documents("movies");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs["a"]["title"], "second");
    }

    #[tokio::test]
    async fn test_index_fault_window() {
        let index = MemoryIndex::new();
        index.fail_next_bulk(2);

        assert!(index.bulk_upsert("movies", &[]).await.is_err());
        assert!(index.bulk_upsert("movies", &[]).await.is_err());
        assert!(index.bulk_upsert("movies", &[]).await.is_ok());

        index.fail_bulk_from_call(5, IndexError::request("bad request"));
        assert!(index.bulk_upsert("movies", &[]).await.is_ok());
        assert!(index.bulk_upsert("movies", &[]).await.is_err());
        assert!(index.bulk_upsert("movies", &[]).await.is_err());

        index.clear_failures();
        assert!(index.bulk_upsert("movies", &[]).await.is_ok());
        assert_eq!(index.bulk_calls(), 7);
    }

    #[tokio::test]
    async fn test_state_store_failures() {
        let store = MemoryStateStore::new();
        store.fail_next_sets(1);

        assert!(store.set("k", "v1").await.is_err());
        store.set("k", "v2").await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some("v2".to_string()));
        assert_eq!(store.set_calls(), 2);
        assert_eq!(store.get("missing").await.unwrap(), None);
    }
}
