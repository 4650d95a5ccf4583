//! Daemon configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

fn default_generate_url() -> String {
    "https://api.replykit.app/v1/generate".to_string()
}

fn default_audio_url() -> String {
    "https://api.replykit.app/v1/analyze-audio".to_string()
}

/// Configuration file contents. Every field has a default so an absent
/// file is a valid configuration.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DaemonConfig {
    /// Reply-generation endpoint.
    #[serde(default = "default_generate_url")]
    pub generate_url: String,

    /// Audio-analysis endpoint.
    #[serde(default = "default_audio_url")]
    pub audio_url: String,

    /// Remote selector source. None runs on compiled-in defaults plus
    /// calibration overrides.
    #[serde(default)]
    pub selector_source_url: Option<String>,

    /// Data directory for the local store. Default: ~/.replykit
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            generate_url: default_generate_url(),
            audio_url: default_audio_url(),
            selector_source_url: None,
            data_dir: None,
        }
    }
}

impl DaemonConfig {
    /// Load from a TOML file; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, anyhow::Error> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Resolved data directory.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(replykit_dir)
    }
}

/// The ~/.replykit directory.
pub(crate) fn replykit_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".replykit"))
        .unwrap_or_else(|| PathBuf::from(".replykit"))
}

/// Default configuration file path.
pub(crate) fn default_config_path() -> PathBuf {
    replykit_dir().join("config.toml")
}
