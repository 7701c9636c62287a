//! State store error types.

use thiserror::Error;

/// Errors that can occur while reading or writing sync state.
#[derive(Error, Debug, Clone)]
pub enum StateError {
    /// The store could not be reached or dropped the connection.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The store rejected the command.
    #[error("Command error: {0}")]
    CommandError(String),
}

impl StateError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a command error.
    pub fn command(msg: impl Into<String>) -> Self {
        Self::CommandError(msg.into())
    }

    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionError(_))
    }
}

impl From<redis::RedisError> for StateError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            Self::ConnectionError(err.to_string())
        } else {
            Self::CommandError(err.to_string())
        }
    }
}
