//! Service settings read from the environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use search_sync_pipeline::{OrchestratorConfig, RetryPolicy};
use search_sync_repository::{PostgresConfig, RedisConfig, SearchConfig};

use crate::ServiceError;

const DEFAULT_POSTGRES_HOST: &str = "localhost";
const DEFAULT_POSTGRES_PORT: u16 = 5432;
const DEFAULT_SEARCH_SCHEME: &str = "http";
const DEFAULT_SEARCH_HOST: &str = "localhost";
const DEFAULT_SEARCH_PORT: u16 = 9200;
const DEFAULT_REDIS_HOST: &str = "localhost";
const DEFAULT_REDIS_PORT: u16 = 6379;
const DEFAULT_BATCH_SIZE: usize = 100;
const DEFAULT_FREQUENCY_SECS: f64 = 60.0;
const DEFAULT_MAX_RETRIES: u32 = 5;
const DEFAULT_MAX_WAIT_SECS: f64 = 30.0;
const DEFAULT_JITTER_SECS: f64 = 1.0;
const DEFAULT_ENTITY_TYPES: &str = "movies,genres,persons";

/// Everything the service needs to start.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub postgres: PostgresConfig,
    pub search: SearchConfig,
    pub redis: RedisConfig,
    /// Documents per bulk request.
    pub batch_size: usize,
    /// Pause between cycles.
    pub frequency: Duration,
    pub retry: RetryPolicy,
    /// Entity types synced each cycle, in order.
    pub entity_types: Vec<String>,
}

impl SyncConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `POSTGRES_HOST` / `POSTGRES_PORT`: source address (default: localhost:5432)
    /// - `POSTGRES_DB`, `POSTGRES_USER`, `POSTGRES_PASSWORD`: required
    /// - `ELASTICSEARCH_SCHEMA` / `ELASTICSEARCH_HOST` / `ELASTICSEARCH_PORT`:
    ///   search index address (default: http://localhost:9200)
    /// - `REDIS_HOST` / `REDIS_PORT`: state store address (default: localhost:6379)
    /// - `BATCH_SIZE`: documents per bulk request (default: 100)
    /// - `FREQUENCY`: seconds between cycles (default: 60)
    /// - `MAX_RETRIES`: attempts per operation (default: 5)
    /// - `MAX_WAIT`: longest backoff in seconds (default: 30)
    /// - `JITTER`: largest random backoff addition in seconds (default: 1)
    /// - `ENTITY_TYPES`: comma separated list (default: movies,genres,persons)
    pub fn from_env() -> Result<Self, ServiceError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration through `lookup`.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let postgres = PostgresConfig {
            host: vars.string_or("POSTGRES_HOST", DEFAULT_POSTGRES_HOST),
            port: vars.parse_or("POSTGRES_PORT", DEFAULT_POSTGRES_PORT)?,
            database: vars.required("POSTGRES_DB")?,
            user: vars.required("POSTGRES_USER")?,
            password: vars.required("POSTGRES_PASSWORD")?,
        };

        let scheme = vars.string_or("ELASTICSEARCH_SCHEMA", DEFAULT_SEARCH_SCHEME);
        if scheme != "http" && scheme != "https" {
            return Err(ServiceError::config(format!(
                "ELASTICSEARCH_SCHEMA must be http or https, got {}",
                scheme
            )));
        }
        let search = SearchConfig {
            scheme,
            host: vars.string_or("ELASTICSEARCH_HOST", DEFAULT_SEARCH_HOST),
            port: vars.parse_or("ELASTICSEARCH_PORT", DEFAULT_SEARCH_PORT)?,
        };

        let redis = RedisConfig {
            host: vars.string_or("REDIS_HOST", DEFAULT_REDIS_HOST),
            port: vars.parse_or("REDIS_PORT", DEFAULT_REDIS_PORT)?,
        };

        let batch_size: usize = vars.parse_or("BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        if batch_size == 0 {
            return Err(ServiceError::config("BATCH_SIZE must be at least 1"));
        }

        let max_attempts: u32 = vars.parse_or("MAX_RETRIES", DEFAULT_MAX_RETRIES)?;
        if max_attempts == 0 {
            return Err(ServiceError::config("MAX_RETRIES must be at least 1"));
        }

        let frequency = vars.seconds_or("FREQUENCY", DEFAULT_FREQUENCY_SECS)?;
        let max_wait = vars.seconds_or("MAX_WAIT", DEFAULT_MAX_WAIT_SECS)?;
        let jitter = vars.seconds_or("JITTER", DEFAULT_JITTER_SECS)?;

        let entity_types: Vec<String> = vars
            .string_or("ENTITY_TYPES", DEFAULT_ENTITY_TYPES)
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();
        if entity_types.is_empty() {
            return Err(ServiceError::config("ENTITY_TYPES must name at least one type"));
        }

        Ok(Self {
            postgres,
            search,
            redis,
            batch_size,
            frequency,
            retry: RetryPolicy::new(max_attempts, max_wait, jitter),
            entity_types,
        })
    }

    /// Orchestrator settings derived from this configuration.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            entity_types: self.entity_types.clone(),
            batch_size: self.batch_size,
            interval: self.frequency,
        }
    }
}

/// Typed access to a variable lookup.
struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, key: &str) -> Result<String, ServiceError> {
        self.get(key)
            .ok_or_else(|| ServiceError::config(format!("{} is not set", key)))
    }

    fn parse_or<T: FromStr>(&self, key: &str, default: T) -> Result<T, ServiceError> {
        match self.get(key) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                ServiceError::config(format!("{} has an invalid value: {}", key, raw))
            }),
            None => Ok(default),
        }
    }

    fn seconds_or(&self, key: &str, default: f64) -> Result<Duration, ServiceError> {
        let secs: f64 = self.parse_or(key, default)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            ServiceError::config(format!("{} must be a non-negative number of seconds", key))
        })
    }
}
