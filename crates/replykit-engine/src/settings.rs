//! User settings.

use serde::{Deserialize, Serialize};
use tracing::warn;

use replykit_protocols::error::StoreError;
use replykit_protocols::{clamp_context_window, KeyValueStore, DEFAULT_CONTEXT_WINDOW};

const SETTINGS_KEY: &str = "settings";

fn default_enabled() -> bool {
    true
}
fn default_tone() -> String {
    "friendly".to_string()
}
fn default_language() -> String {
    "auto".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_context_window() -> i64 {
    DEFAULT_CONTEXT_WINDOW as i64
}

/// Settings the popup UI writes and the engine/adapters read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistSettings {
    /// Master switch. When off, nothing observes and nothing generates.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Reply tone handed to the generation service.
    #[serde(default = "default_tone")]
    pub tone: String,
    /// Reply language; "auto" follows the conversation.
    #[serde(default = "default_language")]
    pub language: String,
    /// Generation model.
    #[serde(default = "default_model")]
    pub model: String,
    /// Requested context window. Stored as written; clamped on use.
    #[serde(default = "default_context_window")]
    pub context_window: i64,
    /// Extra standing instructions appended to the prompt.
    #[serde(default)]
    pub custom_prompt: String,
    /// The user's own API key, forwarded to the service when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for AssistSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            tone: default_tone(),
            language: default_language(),
            model: default_model(),
            context_window: default_context_window(),
            custom_prompt: String::new(),
            api_key: None,
        }
    }
}

impl AssistSettings {
    /// The context window to actually use, clamped into range.
    pub fn effective_window(&self) -> usize {
        clamp_context_window(self.context_window)
    }

    /// Load settings from the store; anything missing or unreadable falls
    /// back to defaults.
    pub async fn load(store: &dyn KeyValueStore) -> Self {
        match store.get_one(SETTINGS_KEY).await {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|e| {
                warn!("Stored settings unreadable ({}), using defaults", e);
                Self::default()
            }),
            Ok(None) => Self::default(),
            Err(e) => {
                warn!("Failed to load settings ({}), using defaults", e);
                Self::default()
            }
        }
    }

    /// Persist settings.
    pub async fn save(&self, store: &dyn KeyValueStore) -> Result<(), StoreError> {
        store
            .set_one(SETTINGS_KEY, serde_json::to_value(self)?)
            .await
    }
}
