//! Adapter errors.

use thiserror::Error;

use super::PageError;

/// Errors surfaced by a platform adapter.
///
/// Most DOM trouble never reaches this type: extraction misses are
/// `Ok(None)` and missing compose elements route to calibration. What
/// remains is transport loss and observer lifecycle failures.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The page transport failed underneath the adapter.
    #[error(transparent)]
    Page(#[from] PageError),

    /// The message observer could not be started.
    #[error("Observer error: {0}")]
    Observer(String),
}

impl AdapterError {
    /// Whether this error means the page session is gone.
    pub fn is_session_loss(&self) -> bool {
        matches!(self, AdapterError::Page(e) if e.is_session_loss())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_error_transparent() {
        let err: AdapterError = PageError::SessionClosed.into();
        assert_eq!(err.to_string(), "Page session closed");
        assert!(err.is_session_loss());
    }

    #[test]
    fn test_observer_display() {
        let err = AdapterError::Observer("container never appeared".to_string());
        assert!(err.to_string().contains("container never appeared"));
        assert!(!err.is_session_loss());
    }
}
