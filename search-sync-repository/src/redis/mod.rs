//! Redis implementation of the state store.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use tracing::debug;

use crate::config::RedisConfig;
use crate::errors::StateError;
use crate::interfaces::StateStore;

/// State store backed by plain Redis string keys.
///
/// Holds only the client handle; a connection is opened for each call and
/// dropped when the call returns.
#[derive(Debug, Clone)]
pub struct RedisStateStore {
    client: Client,
}

impl RedisStateStore {
    /// Create a store for the given parameters. Does not connect.
    pub fn new(config: &RedisConfig) -> Result<Self, StateError> {
        let client = Client::open(config.url()).map_err(StateError::from)?;
        Ok(Self { client })
    }

    async fn connect(&self) -> Result<MultiplexedConnection, StateError> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn)
    }
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StateError> {
        let mut conn = self.connect().await?;
        let value: Option<String> = conn.get(key).await?;
        debug!(key = %key, found = value.is_some(), "Read state");
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StateError> {
        let mut conn = self.connect().await?;
        let _: () = conn.set(key, value).await?;
        debug!(key = %key, value = %value, "Wrote state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_does_not_connect() {
        let config = RedisConfig {
            host: "redis.invalid".to_string(),
            port: 6379,
        };
        assert!(RedisStateStore::new(&config).is_ok());
    }
}
