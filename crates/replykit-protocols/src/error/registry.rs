//! Selector registry errors.

use thiserror::Error;

use super::StoreError;

/// Errors from the selector registry.
///
/// Lookups are total and never produce these; only persistence and the
/// remote refresh can fail, and the refresh failure is swallowed by
/// `init()` anyway.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Persisting or loading registry state failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The remote selector source misbehaved.
    #[error("Remote selector source error: {0}")]
    Remote(String),
}
