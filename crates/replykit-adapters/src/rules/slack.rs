//! Slack heuristics.
//!
//! Slack's virtualized list recycles row nodes aggressively and does not
//! mark direction on the row element itself; own messages are only
//! distinguishable by a nested class or a `data-qa` value. The header poll
//! matters here because channel switches swap content inside the same
//! recycled nodes.

use std::time::Duration;

use replykit_protocols::Platform;

use super::PlatformRules;
use crate::classify::DirectionMarkers;

pub struct SlackRules;

impl PlatformRules for SlackRules {
    fn platform(&self) -> Platform {
        Platform::Slack
    }

    fn ready_selectors(&self) -> &'static [&'static str] {
        &["div.p-workspace__primary_view", "div.p-client_container"]
    }

    fn load_timeout(&self) -> Duration {
        Duration::from_secs(15)
    }

    fn header_selectors(&self) -> &'static [&'static str] {
        &["[data-qa=\"channel_name\"]", "span.p-view_header__channel_title"]
    }

    fn row_selectors(&self) -> &'static [&'static str] {
        &["div.c-message_kit__background", "[data-qa=\"virtual-list-item\"]"]
    }

    fn input_selectors(&self) -> &'static [&'static str] {
        &[
            "div.ql-editor[contenteditable=\"true\"]",
            "[data-qa=\"message_input\"] div[contenteditable=\"true\"]",
        ]
    }

    fn text_selectors(&self) -> &'static [&'static str] {
        &["div.p-rich_text_section", "div.c-message__body"]
    }

    fn nested_marker_selector(&self) -> &'static str {
        "div.c-message_kit__message, div.c-message--own"
    }

    fn direction_markers(&self) -> DirectionMarkers {
        DirectionMarkers {
            incoming_classes: vec!["c-message_kit__message".to_string()],
            outgoing_classes: vec!["c-message--own".to_string()],
            incoming_attr: None,
            outgoing_attr: Some(("data-qa".to_string(), "own_message".to_string())),
        }
    }

    fn watch_conversation_switch(&self) -> bool {
        true
    }
}
