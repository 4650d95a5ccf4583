//! Key-value store errors.

use thiserror::Error;

/// Errors from the local key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document (de)serialization failure.
    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
