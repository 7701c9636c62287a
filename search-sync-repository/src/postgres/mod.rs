//! PostgreSQL implementation of the relational source.

mod client;
pub mod queries;

pub use client::{PostgresSession, PostgresSource};
