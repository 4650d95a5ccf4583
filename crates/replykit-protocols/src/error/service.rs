//! Hosted service errors.

use thiserror::Error;

/// Errors from the hosted generation and analysis endpoints.
///
/// These are the only errors in the system that surface to the user as
/// messages. Quota exhaustion is its own variant so the UI can offer an
/// upgrade path instead of a generic failure.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service rejected the credentials; the user must sign in.
    #[error("Not signed in. Please sign in to generate replies.")]
    Unauthenticated,

    /// The plan's usage limit is exhausted.
    #[error("Usage limit reached")]
    QuotaExceeded { limit: Option<u32> },

    /// Any other non-success response.
    #[error("Service error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Transport failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The service answered with an unexpected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ServiceError {
    /// Map an HTTP status plus body message into the taxonomy.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => ServiceError::Unauthenticated,
            402 => ServiceError::QuotaExceeded { limit: None },
            _ => ServiceError::Api { status, message },
        }
    }
}
