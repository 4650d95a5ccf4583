//! WhatsApp Web heuristics.
//!
//! WhatsApp is the friendliest of the four: rows carry explicit
//! `message-in`/`message-out` classes, and the `data-id` attribute encodes
//! direction as a `false_`/`true_` prefix (false = not from me). It is also
//! the slowest to boot, hence the long load ceiling, and its conversation
//! pane is rebuilt from scratch on every chat switch, hence the unbounded
//! container retry.

use std::time::Duration;

use replykit_protocols::Platform;

use super::PlatformRules;
use crate::classify::DirectionMarkers;

pub struct WhatsAppRules;

impl PlatformRules for WhatsAppRules {
    fn platform(&self) -> Platform {
        Platform::WhatsApp
    }

    fn ready_selectors(&self) -> &'static [&'static str] {
        &["#pane-side", "#side", "div[data-testid=\"chatlist\"]"]
    }

    fn load_timeout(&self) -> Duration {
        Duration::from_secs(30)
    }

    fn header_selectors(&self) -> &'static [&'static str] {
        &[
            "#main header span[dir=\"auto\"]",
            "#main header [data-testid=\"conversation-info-header-chat-title\"]",
        ]
    }

    fn row_selectors(&self) -> &'static [&'static str] {
        &["div.message-in, div.message-out", "#main div[role=\"row\"]"]
    }

    fn input_selectors(&self) -> &'static [&'static str] {
        &[
            "footer div[contenteditable=\"true\"]",
            "div[contenteditable=\"true\"][data-tab]",
        ]
    }

    fn text_selectors(&self) -> &'static [&'static str] {
        &["span.selectable-text span", "span.selectable-text"]
    }

    fn nested_marker_selector(&self) -> &'static str {
        "div.message-in, div.message-out"
    }

    fn direction_markers(&self) -> DirectionMarkers {
        DirectionMarkers {
            incoming_classes: vec!["message-in".to_string()],
            outgoing_classes: vec!["message-out".to_string()],
            incoming_attr: Some(("data-id".to_string(), "false_".to_string())),
            outgoing_attr: Some(("data-id".to_string(), "true_".to_string())),
        }
    }

    fn watch_conversation_switch(&self) -> bool {
        true
    }

    fn container_attempts(&self) -> Option<u32> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{classify_row, Direction, RowView};

    #[test]
    fn test_data_id_prefixes() {
        let markers = WhatsAppRules.direction_markers();
        let mut incoming = RowView {
            text: "hey".to_string(),
            ..Default::default()
        };
        incoming
            .attributes
            .insert("data-id".to_string(), "false_491234@c.us_3EB0".to_string());
        assert_eq!(classify_row(&incoming, &markers), Some(Direction::Incoming));

        let mut outgoing = incoming.clone();
        outgoing
            .attributes
            .insert("data-id".to_string(), "true_491234@c.us_3EB0".to_string());
        assert_eq!(classify_row(&outgoing, &markers), Some(Direction::Outgoing));
    }

    #[test]
    fn test_container_retry_is_unbounded() {
        assert_eq!(WhatsAppRules.container_attempts(), None);
    }
}
