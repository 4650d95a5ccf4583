//! Interactive calibration flow.
//!
//! When selector drift leaves an adapter unable to find its compose box,
//! the user re-points it once: an overlay captures a click on the correct
//! element, a durable selector is derived from it and persisted as a user
//! override, and the page reloads so the new selector takes effect
//! end-to-end.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info};

use replykit_protocols::error::CalibrationError;
use replykit_protocols::{PageDriver, Platform};

use crate::defaults::keys;
use crate::derive::derive_selector;
use crate::registry::SelectorRegistry;

/// Delay between showing the success notice and reloading the page.
const RELOAD_DELAY: Duration = Duration::from_millis(1500);

/// Where the flow currently is. Transitions are strictly linear:
/// `Intro -> Selecting -> Success`, with no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    Intro,
    Selecting,
    Success,
}

/// One run of the calibration flow for one platform.
pub struct CalibrationFlow {
    page: Arc<dyn PageDriver>,
    registry: Arc<SelectorRegistry>,
    platform: Platform,
    reload_delay: Duration,
    state: Mutex<CalibrationState>,
}

impl CalibrationFlow {
    pub fn new(
        page: Arc<dyn PageDriver>,
        registry: Arc<SelectorRegistry>,
        platform: Platform,
    ) -> Self {
        Self {
            page,
            registry,
            platform,
            reload_delay: RELOAD_DELAY,
            state: Mutex::new(CalibrationState::Intro),
        }
    }

    /// Override the reload delay (tests).
    pub fn with_reload_delay(mut self, delay: Duration) -> Self {
        self.reload_delay = delay;
        self
    }

    /// Current flow state.
    pub async fn state(&self) -> CalibrationState {
        *self.state.lock().await
    }

    /// Drive the flow to completion.
    ///
    /// Returns the derived selector. A cancel at the intro step aborts with
    /// nothing persisted; the selecting step waits indefinitely for a human
    /// click, by design.
    pub async fn run(&self) -> Result<String, CalibrationError> {
        if !self.page.show_calibration_intro().await? {
            debug!("Calibration cancelled at intro");
            return Err(CalibrationError::Cancelled);
        }
        *self.state.lock().await = CalibrationState::Selecting;

        let picked = self.page.await_element_pick().await?;
        let selector = derive_selector(&picked);
        debug!("Derived selector {} from picked <{}>", selector, picked.tag);

        self.registry
            .save_user_override(self.platform, keys::INPUT_FIELD, &selector)
            .await?;
        *self.state.lock().await = CalibrationState::Success;

        self.page.show_calibration_done().await?;
        tokio::time::sleep(self.reload_delay).await;
        self.page.reload().await?;

        info!("Calibration complete for {}: {}", self.platform, selector);
        Ok(selector)
    }
}

#[cfg(test)]
#[path = "calibration_tests.rs"]
mod tests;
