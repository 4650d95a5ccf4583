//! LinkedIn messaging heuristics.
//!
//! Covers both the full `/messaging/` page and the overlay bubbles the feed
//! pops up; the selector chains list the full page first. Direction comes
//! from `--other`/`--self` modifier classes on the event list items.

use std::time::Duration;

use replykit_protocols::Platform;

use super::PlatformRules;
use crate::classify::DirectionMarkers;

pub struct LinkedInRules;

impl PlatformRules for LinkedInRules {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    fn ready_selectors(&self) -> &'static [&'static str] {
        &["div.msg-convo-wrapper", "aside.msg-overlay-container"]
    }

    fn load_timeout(&self) -> Duration {
        Duration::from_secs(10)
    }

    fn header_selectors(&self) -> &'static [&'static str] {
        &[
            "h2.msg-entity-lockup__entity-title",
            "span.msg-overlay-bubble-header__title",
        ]
    }

    fn row_selectors(&self) -> &'static [&'static str] {
        &["li.msg-s-message-list__event", "div.msg-s-event-listitem"]
    }

    fn input_selectors(&self) -> &'static [&'static str] {
        &[
            "div.msg-form__contenteditable",
            "div[role=\"textbox\"][contenteditable=\"true\"]",
        ]
    }

    fn text_selectors(&self) -> &'static [&'static str] {
        &["p.msg-s-event-listitem__body", "div.msg-s-event-listitem__message-bubble"]
    }

    fn nested_marker_selector(&self) -> &'static str {
        "div.msg-s-event-listitem--other, div.msg-s-event-listitem--self"
    }

    fn direction_markers(&self) -> DirectionMarkers {
        DirectionMarkers {
            incoming_classes: vec!["msg-s-event-listitem--other".to_string()],
            outgoing_classes: vec!["msg-s-event-listitem--self".to_string()],
            incoming_attr: None,
            outgoing_attr: None,
        }
    }

    fn watch_conversation_switch(&self) -> bool {
        true
    }
}
