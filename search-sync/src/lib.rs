//! # Search Sync
//!
//! Main library for the Postgres to search index synchronizer.
//!
//! This crate provides the configuration and dependency wiring for running
//! the sync pipeline; the binary in `main.rs` only sets up logging and
//! drives the orchestrator.

pub mod config;

pub use config::{Dependencies, SyncConfig};

use thiserror::Error;

/// Errors that can occur during service initialization or execution.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Sync error: {0}")]
    SyncError(#[from] search_sync_pipeline::SyncError),

    /// Search index client error.
    #[error("Index error: {0}")]
    IndexError(#[from] search_sync_repository::IndexError),

    /// State store client error.
    #[error("State store error: {0}")]
    StateError(#[from] search_sync_repository::StateError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ServiceError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
