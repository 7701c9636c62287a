//! Error types for the sync repository.

mod index_error;
mod source_error;
mod state_error;

pub use index_error::IndexError;
pub use source_error::SourceError;
pub use state_error::StateError;
