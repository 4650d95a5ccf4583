//! The shared adapter implementation.
//!
//! One `ChatAdapter` wraps one page plus one platform's rules. All the
//! platform variance lives in [`rules`](crate::rules); this type owns the
//! lifecycle: load wait, extraction entry points, insertion with the
//! calibration escape hatch, observer tasks, teardown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use replykit_protocols::error::AdapterError;
use replykit_protocols::{
    AdapterEvent, CalibrationHandler, ChatContext, ElementInfo, ExtractOptions, PageDriver,
    PlatformAdapter, Platform,
};
use replykit_selectors::{keys, SelectorRegistry};

use crate::extract::{self, ExtractDeps};
use crate::observer::{self, ObserverConfig, ObserverParts};
use crate::rules::PlatformRules;

/// Poll step for [`wait_for_load`](PlatformAdapter::wait_for_load).
const LOAD_POLL: Duration = Duration::from_millis(500);

/// Adapter over one page for one platform.
pub struct ChatAdapter {
    platform: Platform,
    rules: Arc<dyn PlatformRules>,
    page: Arc<dyn PageDriver>,
    registry: Arc<SelectorRegistry>,
    config: ObserverConfig,
    last_processed: Arc<Mutex<Option<String>>>,
    connected: Arc<AtomicBool>,
    observing: AtomicBool,
    calibration: Mutex<Option<CalibrationHandler>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ChatAdapter {
    pub fn new(
        rules: Arc<dyn PlatformRules>,
        page: Arc<dyn PageDriver>,
        registry: Arc<SelectorRegistry>,
        config: ObserverConfig,
    ) -> Self {
        Self {
            platform: rules.platform(),
            rules,
            page,
            registry,
            config,
            last_processed: Arc::new(Mutex::new(None)),
            connected: Arc::new(AtomicBool::new(true)),
            observing: AtomicBool::new(false),
            calibration: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
        }
    }

    fn deps(&self) -> ExtractDeps<'_> {
        ExtractDeps {
            page: &*self.page,
            registry: &self.registry,
            rules: &*self.rules,
        }
    }

    /// Locate the compose element: calibrated/remote selector first, then
    /// the platform chain. Picks the last match - compose boxes sit at the
    /// document end, and stale hidden editors precede them.
    async fn find_input(&self) -> Result<Option<ElementInfo>, AdapterError> {
        let registry_input = self
            .registry
            .get_selector(self.platform, keys::INPUT_FIELD)
            .await;

        let mut selectors: Vec<&str> = Vec::new();
        if !registry_input.is_empty() {
            selectors.push(&registry_input);
        }
        selectors.extend(self.rules.input_selectors());

        for selector in selectors {
            match self.page.query(selector).await {
                Ok(elements) => {
                    if let Some(element) = elements.into_iter().last() {
                        return Ok(Some(element));
                    }
                }
                Err(e) if e.is_session_loss() => return Err(e.into()),
                Err(e) => debug!("Input selector {} failed: {}", selector, e),
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl PlatformAdapter for ChatAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn wait_for_load(&self) -> Result<(), AdapterError> {
        let deadline = Instant::now() + self.rules.load_timeout();

        loop {
            for selector in self.rules.ready_selectors() {
                match self.page.query(selector).await {
                    Ok(elements) if !elements.is_empty() => {
                        debug!("{} ready ({})", self.platform, selector);
                        return Ok(());
                    }
                    Ok(_) => {}
                    Err(e) if e.is_session_loss() => return Err(e.into()),
                    Err(_) => {}
                }
            }

            if Instant::now() >= deadline {
                // Liveness over correctness: proceed and let the observer's
                // retries pick things up if the app renders late.
                warn!(
                    "{} ready marker never appeared within {:?}, proceeding",
                    self.platform,
                    self.rules.load_timeout()
                );
                return Ok(());
            }
            sleep(LOAD_POLL).await;
        }
    }

    async fn extract_context(
        &self,
        options: ExtractOptions,
    ) -> Result<Option<ChatContext>, AdapterError> {
        extract::extract_context(&self.deps(), &self.last_processed, options).await
    }

    async fn insert_text(&self, text: &str) -> Result<(), AdapterError> {
        let Some(input) = self.find_input().await? else {
            warn!("{}: no compose element found, requesting calibration", self.platform);
            let handler = self.calibration.lock().clone();
            if let Some(handler) = handler {
                handler(self.platform);
            }
            return Ok(());
        };

        match self.page.insert_text(input.node, text).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_session_loss() => Err(e.into()),
            Err(e) => {
                debug!("Native insertion failed ({}), using synthetic input", e);
                self.page
                    .set_text_and_notify(input.node, text)
                    .await
                    .map_err(AdapterError::from)
            }
        }
    }

    async fn observe_messages(
        &self,
        events: mpsc::UnboundedSender<AdapterEvent>,
    ) -> Result<(), AdapterError> {
        if self.observing.swap(true, Ordering::SeqCst) {
            debug!("{} already observing", self.platform);
            return Ok(());
        }

        let parts = ObserverParts {
            page: self.page.clone(),
            registry: self.registry.clone(),
            rules: self.rules.clone(),
            last_processed: self.last_processed.clone(),
            connected: self.connected.clone(),
            events,
            config: self.config.clone(),
        };
        let handles = observer::spawn(parts);
        self.tasks.lock().extend(handles);

        info!("{} observer started", self.platform);
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let handles = std::mem::take(&mut *self.tasks.lock());
        for handle in &handles {
            handle.abort();
        }
        self.observing.store(false, Ordering::SeqCst);
        if !handles.is_empty() {
            info!("{} adapter disconnected", self.platform);
        }
    }

    fn set_calibration_handler(&self, handler: CalibrationHandler) {
        *self.calibration.lock() = Some(handler);
    }
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
mod tests;
