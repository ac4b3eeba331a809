//! Error types for the store
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Store Error Enum ==
/// Unified error type for the store.
///
/// Public store operations never surface this error; they log it and degrade
/// to a not-found or no-op result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The identifier could not be turned into an ordering key
    #[error("Key hashing failed: {0}")]
    KeyHash(String),
}

// == Result Type Alias ==
/// Convenience Result type for the store.
pub type Result<T> = std::result::Result<T, StoreError>;
