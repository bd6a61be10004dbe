//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// Only construction and teardown can fail. `update`, `get` and `cleanup`
/// have no rejection path.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Configuration values are inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A sweeper interval was configured outside of a tokio runtime
    #[error("A tokio runtime is required to run the background sweeper")]
    RuntimeUnavailable,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
