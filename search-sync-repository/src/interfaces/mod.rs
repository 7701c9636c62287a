//! Interface definitions for the sync backends.
//!
//! Each backend is split into a connector, which is cheap to hold and knows how
//! to reach the service, and a session, which owns one live connection for the
//! duration of a single call. Sessions are closed explicitly by the caller.

mod record_source;
mod search_index_provider;
mod state_store;

pub use record_source::{SourceConnector, SourceSession};
pub use search_index_provider::{IndexConnector, IndexSession};
pub use state_store::StateStore;
