//! Request and response types for source and search index operations.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// A bounded aggregation query against the relational source.
///
/// The SQL takes the lower bound as its only bind parameter (`$1`) and must
/// return rows ascending by modification time.
#[derive(Debug, Clone)]
pub struct AggregateQuery {
    /// Entity type the query belongs to.
    pub entity_type: String,
    /// Parameterized SQL text.
    pub sql: &'static str,
    /// Exclusive lower bound on the modification timestamp.
    pub modified_after: DateTime<Utc>,
}

impl AggregateQuery {
    /// Create a new query.
    pub fn new(
        entity_type: impl Into<String>,
        sql: &'static str,
        modified_after: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            sql,
            modified_after,
        }
    }
}

/// One aggregate row as returned by the source.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    /// The aggregate rendered as a JSON object.
    pub document: Value,
    /// Modification timestamp of the aggregate root.
    pub modified_at: DateTime<Utc>,
}

impl AggregateRow {
    /// Create a new row.
    pub fn new(document: Value, modified_at: DateTime<Utc>) -> Self {
        Self {
            document,
            modified_at,
        }
    }
}

/// Result of a single item within a bulk request.
#[derive(Debug, Clone)]
pub struct BulkItemResult {
    /// Document id.
    pub id: String,
    /// Whether the item was written.
    pub success: bool,
    /// Error reported for the item, if any.
    pub error: Option<String>,
}

/// Summary of a bulk request containing aggregate statistics and individual results.
#[derive(Debug, Clone, Default)]
pub struct BulkSummary {
    /// Total number of items in the request.
    pub total: usize,
    /// Number of items written.
    pub succeeded: usize,
    /// Number of items rejected.
    pub failed: usize,
    /// Individual results for each item.
    pub results: Vec<BulkItemResult>,
}

impl BulkSummary {
    /// A summary where every document was written.
    pub fn all_succeeded(ids: impl IntoIterator<Item = String>) -> Self {
        let results: Vec<BulkItemResult> = ids
            .into_iter()
            .map(|id| BulkItemResult {
                id,
                success: true,
                error: None,
            })
            .collect();

        Self {
            total: results.len(),
            succeeded: results.len(),
            failed: 0,
            results,
        }
    }

    /// The first reported item error.
    pub fn first_error(&self) -> Option<&str> {
        self.results.iter().find_map(|r| r.error.as_deref())
    }
}
