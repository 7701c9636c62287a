//! OpenSearch implementation of the search index provider.
//!
//! This module provides a concrete implementation of `IndexConnector`
//! and `IndexSession` using OpenSearch as the backend. The bulk API is
//! wire compatible with Elasticsearch 7.

mod client;
pub mod index_config;

pub use client::{OpenSearchConnector, OpenSearchSession};
