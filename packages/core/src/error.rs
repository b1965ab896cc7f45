//! Error taxonomy for store operations.

use std::fmt;

/// Why a batch stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelCause {
    /// The caller fired the cancellation token.
    Cancelled,
    /// The context deadline passed.
    DeadlineExceeded,
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelCause::Cancelled => f.write_str("context canceled"),
            CancelCause::DeadlineExceeded => f.write_str("context deadline exceeded"),
        }
    }
}

/// Errors returned by [`Store`](crate::Store) operations.
///
/// `NotFound` and `StoreFull` are expected, recoverable outcomes. `Cancelled`
/// is only produced by batch operations, after any backend-specific rollback
/// has already run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("key not found: {key}")]
    NotFound { key: String },
    #[error("kv store is full")]
    StoreFull,
    #[error("batch aborted: {0}")]
    Cancelled(CancelCause),
    #[error("operation not supported: {operation}")]
    Unsupported { operation: &'static str },
}

impl StoreError {
    pub(crate) fn not_found(key: &str) -> Self {
        StoreError::NotFound {
            key: key.to_string(),
        }
    }

    /// Returns `true` for [`StoreError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Result alias used throughout the store contract.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors from turning a [`StoreConfig`](crate::StoreConfig) into a backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("capacity must be greater than zero")]
    ZeroCapacity,
    #[error("the lru backend requires a capacity")]
    UnboundedLru,
}
