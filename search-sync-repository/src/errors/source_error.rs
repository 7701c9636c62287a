//! Relational source error types.

use thiserror::Error;
use tokio_postgres::error::SqlState;

/// Errors that can occur while reading from the relational source.
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    /// Could not connect, or the connection was lost mid-query.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The server rejected the query.
    #[error("Query error: {0}")]
    QueryError(String),

    /// A returned row does not have the expected columns or types.
    #[error("Decode error: {0}")]
    DecodeError(String),
}

impl SourceError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeError(msg.into())
    }

    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionError(_))
    }

    /// Classify a driver error returned while connecting or querying.
    ///
    /// Server-reported errors outside the connection classes, such as a
    /// rejected password (class 28), are not transient.
    pub fn from_driver_error(error: &tokio_postgres::Error) -> Self {
        Self::classify(error.is_closed(), error.code(), error.to_string())
    }

    fn classify(closed: bool, code: Option<&SqlState>, msg: String) -> Self {
        if closed {
            return Self::connection(msg);
        }

        match code {
            Some(code) if is_transient_state(code) => Self::connection(msg),
            Some(_) => Self::query(msg),
            // No SQLSTATE means the failure happened below the protocol (io, tls)
            None => Self::connection(msg),
        }
    }
}

/// SQLSTATE codes that signal a connection level problem.
fn is_transient_state(code: &SqlState) -> bool {
    code.code().starts_with("08")
        || *code == SqlState::ADMIN_SHUTDOWN
        || *code == SqlState::CRASH_SHUTDOWN
        || *code == SqlState::CANNOT_CONNECT_NOW
        || *code == SqlState::TOO_MANY_CONNECTIONS
}
