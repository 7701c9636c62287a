//! Extractor module for the sync pipeline.
//!
//! Reads aggregate rows changed since the watermark from the relational source.

use std::sync::Arc;

use search_sync_repository::{AggregateQuery, AggregateRow, SourceConnector};
use search_sync_shared::{ExtractedRecord, Watermark};
use tracing::{debug, info, instrument};

use crate::errors::SyncError;
use crate::registry::EntityRegistry;
use crate::retry::RetryPolicy;

/// Extractor that issues the bounded aggregation query for an entity type.
///
/// A connection is opened for each extraction and closed before the call
/// returns, whether the query succeeded or not.
pub struct Extractor {
    source: Arc<dyn SourceConnector>,
    registry: Arc<EntityRegistry>,
    retry: RetryPolicy,
}

impl Extractor {
    /// Create a new extractor.
    pub fn new(
        source: Arc<dyn SourceConnector>,
        registry: Arc<EntityRegistry>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            source,
            registry,
            retry,
        }
    }

    /// Extract every record of `entity_type` modified after `watermark`,
    /// ascending by modification time.
    ///
    /// # Returns
    ///
    /// * `Ok(records)` - Validated records, possibly empty
    /// * `Err(SyncError::UnsupportedEntityType)` - Before any I/O, for unknown types
    /// * `Err(SyncError::RetryExhausted)` - If the source stayed unreachable
    /// * `Err(SyncError::ValidationError)` - If a row does not fit the document shape
    #[instrument(skip(self, watermark), fields(watermark = %watermark))]
    pub async fn extract(
        &self,
        entity_type: &str,
        watermark: &Watermark,
    ) -> Result<Vec<ExtractedRecord>, SyncError> {
        let definition = self.registry.resolve(entity_type)?;
        let query = AggregateQuery::new(definition.name, definition.sql, watermark.timestamp());

        info!("About to extract data from source");

        let rows = self
            .retry
            .run("extract", || self.fetch(&query))
            .await?;

        Self::check_ascending(entity_type, &rows)?;

        let records = rows
            .into_iter()
            .map(|row| definition.shape_row(row))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = records.len(), "Extracted records");
        Ok(records)
    }

    /// One connect-query-close round trip.
    async fn fetch(&self, query: &AggregateQuery) -> Result<Vec<AggregateRow>, SyncError> {
        let mut session = self.source.connect().await?;
        let result = session.fetch_aggregates(query).await;
        session.close().await;
        Ok(result?)
    }

    /// The watermark commit relies on the last row carrying the maximum
    /// timestamp, so out of order rows are a shape error.
    fn check_ascending(entity_type: &str, rows: &[AggregateRow]) -> Result<(), SyncError> {
        match rows
            .windows(2)
            .position(|pair| pair[0].modified_at > pair[1].modified_at)
        {
            Some(position) => Err(SyncError::validation(format!(
                "{} rows are not ordered by modification time at position {}",
                entity_type,
                position + 1
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use search_sync_repository::memory::MemorySource;
    use serde_json::json;
    use std::time::Duration;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()
    }

    fn genre_row(id: &str, hour: u32) -> AggregateRow {
        AggregateRow::new(
            json!({"id": id, "name": format!("genre {}", hour), "description": null}),
            at(hour),
        )
    }

    fn extractor(source: &MemorySource, attempts: u32) -> Extractor {
        Extractor::new(
            Arc::new(source.clone()),
            Arc::new(EntityRegistry::catalog()),
            RetryPolicy::new(attempts, Duration::from_secs(1), Duration::ZERO),
        )
    }

    #[tokio::test]
    async fn test_extracts_rows_after_watermark_in_order() {
        let source = MemorySource::new();
        source.insert("genres", genre_row("6ba7b810-9dad-11d1-80b4-00c04fd430c8", 5));
        source.insert("genres", genre_row("550e8400-e29b-41d4-a716-446655440000", 3));
        source.insert("genres", genre_row("7c9e6679-7425-40de-944b-e07fc1f90ae7", 1));

        let records = extractor(&source, 3)
            .extract("genres", &Watermark::new(at(1)))
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].modified_at, Watermark::new(at(3)));
        assert_eq!(records[1].modified_at, Watermark::new(at(5)));
        assert_eq!(source.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_unknown_type_fails_fast_without_connecting() {
        let source = MemorySource::new();

        let err = extractor(&source, 3)
            .extract("cartoons", &Watermark::earliest())
            .await
            .unwrap_err();

        assert!(err.is_skippable());
        assert_eq!(source.connect_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_connection_failures() {
        let source = MemorySource::new();
        source.insert("genres", genre_row("550e8400-e29b-41d4-a716-446655440000", 2));
        source.fail_next_connects(2);

        let records = extractor(&source, 3)
            .extract("genres", &Watermark::earliest())
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(source.connect_count(), 3);
        assert_eq!(source.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_malformed_row_is_validation_error() {
        let source = MemorySource::new();
        source.insert(
            "movies",
            AggregateRow::new(json!({"id": "550e8400-e29b-41d4-a716-446655440000"}), at(2)),
        );

        let err = extractor(&source, 3)
            .extract("movies", &Watermark::earliest())
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::ValidationError(_)));
        assert_eq!(source.open_sessions(), 0);
    }

    #[test]
    fn test_check_ascending() {
        let ordered = vec![genre_row("a", 1), genre_row("b", 1), genre_row("c", 2)];
        assert!(Extractor::check_ascending("genres", &ordered).is_ok());

        let unordered = vec![genre_row("a", 2), genre_row("b", 1)];
        assert!(Extractor::check_ascending("genres", &unordered).is_err());
    }
}
