//! Dependency initialization and wiring for the synchronizer.

use std::sync::Arc;
use tracing::info;

use crate::config::SyncConfig;
use crate::ServiceError;
use search_sync_pipeline::{
    EntityRegistry, Extractor, Orchestrator, SearchLoader, Transformer, WatermarkStore,
};
use search_sync_repository::{OpenSearchConnector, PostgresSource, RedisStateStore};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Wire the backends and pipeline components from `config`.
    ///
    /// No connection is opened here; every component connects on use.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(ServiceError)` - If a client cannot be built from the configuration
    pub fn new(config: &SyncConfig) -> Result<Self, ServiceError> {
        info!(
            postgres_host = %config.postgres.host,
            postgres_db = %config.postgres.database,
            search_url = %config.search.url(),
            redis_url = %config.redis.url(),
            batch_size = config.batch_size,
            "Initializing dependencies"
        );

        let source = PostgresSource::new(config.postgres.clone());
        let index = OpenSearchConnector::from_config(&config.search)?;
        let state = RedisStateStore::new(&config.redis)?;

        let registry = Arc::new(EntityRegistry::catalog());
        let watermarks = WatermarkStore::new(Arc::new(state), config.retry.clone());

        let extractor = Extractor::new(Arc::new(source), registry.clone(), config.retry.clone());
        let transformer = Transformer::new(watermarks.clone());
        let loader = SearchLoader::new(Arc::new(index), registry, config.retry.clone());

        let orchestrator = Orchestrator::new(
            watermarks,
            extractor,
            transformer,
            loader,
            config.orchestrator_config(),
        );

        Ok(Self { orchestrator })
    }
}
