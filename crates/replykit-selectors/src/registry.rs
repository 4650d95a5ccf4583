//! The three-layer selector registry.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use replykit_protocols::error::RegistryError;
use replykit_protocols::{KeyValueStore, Platform};

use crate::defaults::{default_selector, platform_defaults};
use crate::remote::RemoteSelectorSource;

/// Storage key for the cached remote layer.
const STORE_KEY_REMOTE: &str = "selectors.remote";
/// Storage key for user overrides from calibration.
const STORE_KEY_OVERRIDES: &str = "selectors.overrides";

/// Fully merged selector map for one platform.
pub type SelectorConfig = HashMap<String, String>;

type LayerMap = HashMap<Platform, HashMap<String, String>>;

/// Per-platform selector resolution: user override > remote > default > "".
///
/// The registry is shared process-wide: calibration writes, every adapter
/// reads. In-memory state is updated before persistence so a same-session
/// read always sees the latest write, even while the store round trip is
/// still in flight.
pub struct SelectorRegistry {
    store: Arc<dyn KeyValueStore>,
    remote_source: Option<RemoteSelectorSource>,
    remote: RwLock<LayerMap>,
    overrides: RwLock<LayerMap>,
}

impl SelectorRegistry {
    /// Create a registry with no remote source; defaults and overrides only.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            remote_source: None,
            remote: RwLock::new(HashMap::new()),
            overrides: RwLock::new(HashMap::new()),
        }
    }

    /// Attach a remote selector source used by `init`/`refresh`.
    pub fn with_remote(mut self, source: RemoteSelectorSource) -> Self {
        self.remote_source = Some(source);
        self
    }

    /// Load cached layers from the store, then refresh from the remote
    /// source on a best-effort basis.
    ///
    /// Idempotent, and never fails: a broken store or remote source leaves
    /// the registry running on whatever is already loaded - defaults at
    /// minimum. Must never block page functionality.
    pub async fn init(&self) {
        match self.load_layer(STORE_KEY_REMOTE).await {
            Ok(layer) => *self.remote.write().await = layer,
            Err(e) => warn!("Failed to load cached remote selectors: {}", e),
        }
        match self.load_layer(STORE_KEY_OVERRIDES).await {
            Ok(layer) => *self.overrides.write().await = layer,
            Err(e) => warn!("Failed to load selector overrides: {}", e),
        }

        if let Err(e) = self.refresh().await {
            warn!("Selector refresh failed, continuing with cached values: {}", e);
        }
    }

    /// Re-fetch the remote layer and persist it.
    ///
    /// A no-op when no remote source is configured.
    pub async fn refresh(&self) -> Result<(), RegistryError> {
        let Some(source) = &self.remote_source else {
            return Ok(());
        };

        let rows = source.fetch_rows().await?;
        let mut layer: LayerMap = HashMap::new();
        for row in rows {
            if !row.is_active {
                continue;
            }
            let Some(platform) = Platform::from_key(&row.platform) else {
                debug!("Skipping selector row for unknown platform {:?}", row.platform);
                continue;
            };
            layer
                .entry(platform)
                .or_default()
                .insert(row.selector_key, row.selector_value);
        }

        let count: usize = layer.values().map(HashMap::len).sum();
        *self.remote.write().await = layer.clone();
        self.persist_layer(STORE_KEY_REMOTE, &layer).await?;
        info!("Refreshed {} remote selectors", count);
        Ok(())
    }

    /// Resolve one selector: override > remote > default > `""`.
    ///
    /// Total; an unknown key yields an empty string and the caller uses its
    /// own fallback literals.
    pub async fn get_selector(&self, platform: Platform, key: &str) -> String {
        if let Some(value) = layer_get(&*self.overrides.read().await, platform, key) {
            return value;
        }
        if let Some(value) = layer_get(&*self.remote.read().await, platform, key) {
            return value;
        }
        default_selector(platform, key).to_string()
    }

    /// Full merged map for one platform, same precedence per key.
    pub async fn get_selectors(&self, platform: Platform) -> SelectorConfig {
        let mut merged: SelectorConfig = platform_defaults(platform)
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        if let Some(remote) = self.remote.read().await.get(&platform) {
            merged.extend(remote.clone());
        }
        if let Some(overrides) = self.overrides.read().await.get(&platform) {
            merged.extend(overrides.clone());
        }
        merged
    }

    /// Record a user override from calibration.
    ///
    /// The in-memory map is updated first so subsequent reads in this
    /// session see the value even if persistence is still pending; the
    /// write is durable once this returns `Ok`.
    pub async fn save_user_override(
        &self,
        platform: Platform,
        key: &str,
        value: &str,
    ) -> Result<(), RegistryError> {
        let snapshot = {
            let mut overrides = self.overrides.write().await;
            overrides
                .entry(platform)
                .or_default()
                .insert(key.to_string(), value.to_string());
            overrides.clone()
        };
        self.persist_layer(STORE_KEY_OVERRIDES, &snapshot).await?;
        info!("Saved selector override {}/{} = {}", platform, key, value);
        Ok(())
    }

    async fn load_layer(&self, store_key: &str) -> Result<LayerMap, RegistryError> {
        let Some(value) = self.store.get_one(store_key).await? else {
            return Ok(HashMap::new());
        };
        let by_name: HashMap<String, HashMap<String, String>> =
            serde_json::from_value(value).unwrap_or_default();
        Ok(by_name
            .into_iter()
            .filter_map(|(name, map)| Platform::from_key(&name).map(|p| (p, map)))
            .collect())
    }

    async fn persist_layer(&self, store_key: &str, layer: &LayerMap) -> Result<(), RegistryError> {
        let by_name: HashMap<&str, &HashMap<String, String>> =
            layer.iter().map(|(p, m)| (p.as_str(), m)).collect();
        self.store.set_one(store_key, json!(by_name)).await?;
        Ok(())
    }
}

fn layer_get(layer: &LayerMap, platform: Platform, key: &str) -> Option<String> {
    layer
        .get(&platform)
        .and_then(|map| map.get(key))
        .filter(|v| !v.is_empty())
        .cloned()
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
