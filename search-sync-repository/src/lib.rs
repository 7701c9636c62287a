//! # Search Sync Repository
//!
//! This crate provides traits and implementations for the three backends the
//! synchronizer talks to: the relational source, the search index and the
//! state store holding watermarks.
//!
//! Concrete implementations are PostgreSQL, OpenSearch and Redis; the
//! `memory` module, behind the `test-util` feature, provides in-memory
//! doubles for tests.

pub mod config;
pub mod errors;
pub mod interfaces;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod opensearch;
pub mod postgres;
pub mod redis;
pub mod types;

pub use config::{PostgresConfig, RedisConfig, SearchConfig};
pub use errors::{IndexError, SourceError, StateError};
pub use interfaces::{IndexConnector, IndexSession, SourceConnector, SourceSession, StateStore};
pub use crate::opensearch::OpenSearchConnector;
pub use crate::postgres::PostgresSource;
pub use crate::redis::RedisStateStore;
pub use types::{AggregateQuery, AggregateRow, BulkItemResult, BulkSummary};
