//! PostgreSQL client connection and row decoding.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, instrument, warn};

use crate::config::PostgresConfig;
use crate::errors::SourceError;
use crate::interfaces::{SourceConnector, SourceSession};
use crate::types::{AggregateQuery, AggregateRow};

/// Column holding the aggregate rendered as JSON.
const DOCUMENT_COLUMN: &str = "document";
/// Column holding the aggregate's modification timestamp.
const MODIFIED_COLUMN: &str = "modified";

/// Connector for the relational source. Holds parameters only; every call to
/// [`SourceConnector::connect`] opens a new connection.
#[derive(Debug, Clone)]
pub struct PostgresSource {
    config: PostgresConfig,
}

impl PostgresSource {
    /// Create a connector for the given parameters.
    pub fn new(config: PostgresConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SourceConnector for PostgresSource {
    async fn connect(&self) -> Result<Box<dyn SourceSession>, SourceError> {
        let (client, connection) = self
            .config
            .to_pg_config()
            .connect(NoTls)
            .await
            .map_err(|e| SourceError::from_driver_error(&e))?;

        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "PostgreSQL connection error");
            }
        });

        debug!(
            host = %self.config.host,
            port = self.config.port,
            database = %self.config.database,
            "Opened PostgreSQL session"
        );

        Ok(Box::new(PostgresSession { client, driver }))
    }
}

/// One live PostgreSQL connection.
///
/// The connection driver runs as its own task and finishes once the client is
/// dropped, so closing the session always releases the socket.
pub struct PostgresSession {
    client: Client,
    driver: JoinHandle<()>,
}

impl PostgresSession {
    fn decode_row(row: &Row) -> Result<AggregateRow, SourceError> {
        let document: Value = row
            .try_get(DOCUMENT_COLUMN)
            .map_err(|e| SourceError::decode(format!("{}: {}", DOCUMENT_COLUMN, e)))?;
        let modified_at: DateTime<Utc> = row
            .try_get(MODIFIED_COLUMN)
            .map_err(|e| SourceError::decode(format!("{}: {}", MODIFIED_COLUMN, e)))?;

        Ok(AggregateRow::new(document, modified_at))
    }
}

#[async_trait]
impl SourceSession for PostgresSession {
    #[instrument(skip(self, query), fields(entity_type = %query.entity_type))]
    async fn fetch_aggregates(
        &mut self,
        query: &AggregateQuery,
    ) -> Result<Vec<AggregateRow>, SourceError> {
        let rows = self
            .client
            .query(query.sql, &[&query.modified_after])
            .await
            .map_err(|e| SourceError::from_driver_error(&e))?;

        debug!(rows = rows.len(), "Fetched aggregate rows");

        rows.iter().map(Self::decode_row).collect()
    }

    async fn close(self: Box<Self>) {
        let Self { client, driver } = *self;
        drop(client);
        if let Err(e) = driver.await {
            warn!(error = %e, "PostgreSQL connection task did not finish cleanly");
        }
        debug!("Closed PostgreSQL session");
    }
}
