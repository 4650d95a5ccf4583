//! Page transport errors.

use thiserror::Error;

/// Errors from the page transport layer.
///
/// Element misses never appear here; a selector that matches nothing is an
/// empty result at the `PageDriver` level.
#[derive(Debug, Error)]
pub enum PageError {
    /// Failed to connect to the browser.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Browser not reachable at the debugging endpoint.
    #[error("Browser not available at {0}. Start Chromium with: chrome --remote-debugging-port=9222")]
    BrowserNotAvailable(String),

    /// WebSocket transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// DevTools protocol error.
    #[error("Protocol error: {message} (code: {code})")]
    Protocol { code: i64, message: String },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error during endpoint discovery.
    #[error("HTTP error: {0}")]
    Http(String),

    /// No attachable page target matched.
    #[error("Page target not found: {0}")]
    TargetNotFound(String),

    /// In-page script evaluation failed.
    #[error("JavaScript error: {0}")]
    Javascript(String),

    /// A page command timed out.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The page session is gone: tab closed, browser exited, or the
    /// debugger detached. Callers should stop work, not retry.
    #[error("Page session closed")]
    SessionClosed,

    /// Response did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl PageError {
    /// Whether this error means the page is gone for good.
    pub fn is_session_loss(&self) -> bool {
        matches!(self, PageError::SessionClosed)
    }
}
