//! Fiverr inbox heuristics.
//!
//! The lightest of the four: a plain textarea compose box and
//! `message-received`/`message-sent` row classes. Fiverr renders its inbox
//! synchronously, so the load ceiling is short and the header poll is not
//! needed - switching conversations navigates to a new URL.

use std::time::Duration;

use replykit_protocols::Platform;

use super::PlatformRules;
use crate::classify::DirectionMarkers;

pub struct FiverrRules;

impl PlatformRules for FiverrRules {
    fn platform(&self) -> Platform {
        Platform::Fiverr
    }

    fn ready_selectors(&self) -> &'static [&'static str] {
        &["div.conversation-page", "div.inbox-page"]
    }

    fn load_timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    fn header_selectors(&self) -> &'static [&'static str] {
        &["div.conversation-header span.username", "a.conversation-title"]
    }

    fn row_selectors(&self) -> &'static [&'static str] {
        &["li.message-item", "div.message-bubble"]
    }

    fn input_selectors(&self) -> &'static [&'static str] {
        &[
            "textarea[data-qa=\"message-box\"]",
            "textarea.new-message-box",
            "div[contenteditable=\"true\"]",
        ]
    }

    fn text_selectors(&self) -> &'static [&'static str] {
        &["div.message-body", "p.message-text"]
    }

    fn nested_marker_selector(&self) -> &'static str {
        "div.message-received, div.message-sent"
    }

    fn direction_markers(&self) -> DirectionMarkers {
        DirectionMarkers {
            incoming_classes: vec!["message-received".to_string()],
            outgoing_classes: vec!["message-sent".to_string()],
            incoming_attr: None,
            outgoing_attr: None,
        }
    }
}
