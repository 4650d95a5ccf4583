//! Remote selector source client.
//!
//! The backend serves flat rows of `(platform, selector_key,
//! selector_value, is_active)`. Fetching is strictly best-effort: the
//! registry's `init` swallows every failure here, because the extension
//! must keep working on compiled-in defaults when the backend is down.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use replykit_protocols::error::RegistryError;

/// One selector row as served by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorRow {
    pub platform: String,
    pub selector_key: String,
    pub selector_value: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// HTTP client for the remote selector source.
pub struct RemoteSelectorSource {
    client: reqwest::Client,
    url: String,
}

impl RemoteSelectorSource {
    /// Create a source reading from `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            url: url.into(),
        }
    }

    /// Fetch all selector rows.
    pub async fn fetch_rows(&self) -> Result<Vec<SelectorRow>, RegistryError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| RegistryError::Remote(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RegistryError::Remote(format!(
                "HTTP {}",
                response.status().as_u16()
            )));
        }

        let rows: Vec<SelectorRow> = response
            .json()
            .await
            .map_err(|e| RegistryError::Remote(e.to_string()))?;
        debug!("Fetched {} selector rows from {}", rows.len(), self.url);
        Ok(rows)
    }
}
