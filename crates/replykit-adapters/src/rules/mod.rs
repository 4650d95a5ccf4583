//! Per-platform DOM heuristics.
//!
//! Each platform contributes its selector chains, direction markers and
//! timing quirks through [`PlatformRules`]; the adapter, observer and
//! extraction machinery are shared. Selector chains listed here are the
//! compiled-in fallbacks - registry values, when present, are consulted
//! first.

use std::sync::Arc;
use std::time::Duration;

use replykit_protocols::Platform;

use crate::classify::DirectionMarkers;

mod fiverr;
mod linkedin;
mod slack;
mod whatsapp;

pub use fiverr::FiverrRules;
pub use linkedin::LinkedInRules;
pub use slack::SlackRules;
pub use whatsapp::WhatsAppRules;

/// Platform-specific knowledge the shared machinery plugs in.
pub trait PlatformRules: Send + Sync {
    fn platform(&self) -> Platform;

    /// "App ready" markers, in priority order.
    fn ready_selectors(&self) -> &'static [&'static str];

    /// Hard ceiling for [`wait_for_load`](replykit_protocols::PlatformAdapter::wait_for_load).
    fn load_timeout(&self) -> Duration;

    /// Header candidates carrying the other party's name, in priority order.
    fn header_selectors(&self) -> &'static [&'static str];

    /// Fallback message-row selectors.
    fn row_selectors(&self) -> &'static [&'static str];

    /// Fallback compose-box selectors.
    fn input_selectors(&self) -> &'static [&'static str];

    /// Clean-text selectors inside a row, in priority order.
    fn text_selectors(&self) -> &'static [&'static str];

    /// Selector matching direction-marked descendants inside a row, or `""`
    /// when the platform marks rows directly.
    fn nested_marker_selector(&self) -> &'static str {
        ""
    }

    /// Direction markers for row classification.
    fn direction_markers(&self) -> DirectionMarkers;

    /// Whether the observer runs the header-title poll that catches
    /// conversation switches virtualized lists hide from mutation events.
    fn watch_conversation_switch(&self) -> bool {
        false
    }

    /// How many times to retry locating the message container before
    /// observing without it. `None` retries forever.
    fn container_attempts(&self) -> Option<u32> {
        Some(30)
    }
}

/// Rules for a platform.
pub fn rules_for(platform: Platform) -> Arc<dyn PlatformRules> {
    match platform {
        Platform::WhatsApp => Arc::new(WhatsAppRules),
        Platform::Slack => Arc::new(SlackRules),
        Platform::LinkedIn => Arc::new(LinkedInRules),
        Platform::Fiverr => Arc::new(FiverrRules),
    }
}
