//! Calibration flow errors.

use thiserror::Error;

use super::{PageError, RegistryError};

/// Errors from the interactive calibration flow.
#[derive(Debug, Error)]
pub enum CalibrationError {
    /// The user backed out at the intro step. Nothing was persisted.
    #[error("Calibration cancelled")]
    Cancelled,

    /// The page went away mid-flow.
    #[error(transparent)]
    Page(#[from] PageError),

    /// The derived selector could not be persisted.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_display() {
        assert_eq!(CalibrationError::Cancelled.to_string(), "Calibration cancelled");
    }

    #[test]
    fn test_page_transparent() {
        let err: CalibrationError = PageError::SessionClosed.into();
        assert_eq!(err.to_string(), "Page session closed");
    }
}
