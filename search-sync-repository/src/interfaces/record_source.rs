//! Relational source trait definitions.

use async_trait::async_trait;

use crate::errors::SourceError;
use crate::types::{AggregateQuery, AggregateRow};

/// Opens sessions against the relational source.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Open a new connection.
    ///
    /// # Returns
    ///
    /// * `Ok(session)` - A live session the caller must close
    /// * `Err(SourceError::ConnectionError)` - If the source is unreachable
    async fn connect(&self) -> Result<Box<dyn SourceSession>, SourceError>;
}

/// A live connection to the relational source.
#[async_trait]
pub trait SourceSession: Send {
    /// Run an aggregation query and return every row it produces.
    ///
    /// Rows are returned in the order the query defines, which for every
    /// registered entity type is ascending modification time.
    async fn fetch_aggregates(
        &mut self,
        query: &AggregateQuery,
    ) -> Result<Vec<AggregateRow>, SourceError>;

    /// Release the connection.
    async fn close(self: Box<Self>);
}
