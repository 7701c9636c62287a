//! State store trait definition.

use async_trait::async_trait;

use crate::errors::StateError;

/// Durable string key/value storage for sync state.
///
/// Values are opaque to the store.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read a value, `None` if the key was never written.
    async fn get(&self, key: &str) -> Result<Option<String>, StateError>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<(), StateError>;
}
