//! Search index error types.
//!
//! This module defines the error types that can occur during search index operations.

use thiserror::Error;

/// Errors that can occur during search index operations.
#[derive(Debug, Clone, Error)]
pub enum IndexError {
    /// Failed to establish connection to the search engine.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The search engine answered with a throttling or availability status.
    #[error("Search engine unavailable: {0}")]
    UnavailableError(String),

    /// The search engine rejected the request.
    #[error("Request error: {0}")]
    RequestError(String),

    /// Bulk operation had failures.
    #[error("Bulk operation error: {failed} of {total} documents failed: {first_error}")]
    BulkOperationError {
        failed: usize,
        total: usize,
        first_error: String,
    },

    /// Failed to parse response from the search engine.
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl IndexError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a request error.
    pub fn request(msg: impl Into<String>) -> Self {
        Self::RequestError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a bulk operation error.
    pub fn bulk_operation(failed: usize, total: usize, first_error: impl Into<String>) -> Self {
        Self::BulkOperationError {
            failed,
            total,
            first_error: first_error.into(),
        }
    }

    /// Build an error from an unsuccessful HTTP status.
    pub fn from_status(status: u16, context: &str, body: &str) -> Self {
        let msg = format!("{} failed with status {}: {}", context, status, body);
        match status {
            429 | 502 | 503 | 504 => Self::UnavailableError(msg),
            _ => Self::RequestError(msg),
        }
    }

    /// Whether retrying the same call may succeed.
    ///
    /// Partial bulk failures count as transient: the whole load is replayed
    /// and documents already written are overwritten with the same content.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionError(_)
            | Self::UnavailableError(_)
            | Self::BulkOperationError { .. }
            | Self::ParseError(_) => true,
            Self::RequestError(_) => false,
        }
    }
}
