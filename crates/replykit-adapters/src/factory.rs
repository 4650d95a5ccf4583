//! Adapter selection.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use replykit_protocols::error::AdapterError;
use replykit_protocols::{PageDriver, Platform, PlatformAdapter};
use replykit_selectors::SelectorRegistry;

use crate::adapter::ChatAdapter;
use crate::observer::ObserverConfig;
use crate::rules::rules_for;

/// Picks and owns the single adapter for a page.
///
/// Dispatch is a fixed, mutually exclusive URL check in [`Platform::ALL`]
/// order; the first match wins. Pages matching nothing are left untouched.
/// The chosen adapter is memoized for the factory's lifetime, which is the
/// page's lifetime.
pub struct AdapterFactory {
    page: Arc<dyn PageDriver>,
    registry: Arc<SelectorRegistry>,
    config: ObserverConfig,
    cached: Mutex<Option<Arc<dyn PlatformAdapter>>>,
}

impl AdapterFactory {
    pub fn new(page: Arc<dyn PageDriver>, registry: Arc<SelectorRegistry>) -> Self {
        Self::with_config(page, registry, ObserverConfig::default())
    }

    pub fn with_config(
        page: Arc<dyn PageDriver>,
        registry: Arc<SelectorRegistry>,
        config: ObserverConfig,
    ) -> Self {
        Self {
            page,
            registry,
            config,
            cached: Mutex::new(None),
        }
    }

    /// Which platform owns a URL, if any. Pure; safe to call repeatedly
    /// before the page has loaded.
    pub fn resolve(url: &str) -> Option<Platform> {
        Platform::ALL.into_iter().find(|p| p.url_matches(url))
    }

    /// The adapter for the current page, memoized. `None` when no platform
    /// claims the URL.
    pub async fn get(&self) -> Result<Option<Arc<dyn PlatformAdapter>>, AdapterError> {
        let mut cached = self.cached.lock().await;
        if let Some(adapter) = cached.as_ref() {
            return Ok(Some(adapter.clone()));
        }

        let url = self.page.url().await?;
        let Some(platform) = Self::resolve(&url) else {
            return Ok(None);
        };

        info!("Platform {} claims {}", platform, url);
        let adapter: Arc<dyn PlatformAdapter> = Arc::new(ChatAdapter::new(
            rules_for(platform),
            self.page.clone(),
            self.registry.clone(),
            self.config.clone(),
        ));
        *cached = Some(adapter.clone());
        Ok(Some(adapter))
    }
}
