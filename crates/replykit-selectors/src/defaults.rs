//! Compiled-in selector defaults.
//!
//! These reflect the platforms' markup at the time of writing and are the
//! lowest-priority layer; the remote source and calibration overrides exist
//! precisely because these go stale.

use replykit_protocols::Platform;

/// Semantic selector keys shared across platforms.
pub mod keys {
    /// The compose box.
    pub const INPUT_FIELD: &str = "input_field";
    /// Scroll container holding the message list.
    pub const MESSAGE_CONTAINER: &str = "message_container";
    /// One message row.
    pub const MESSAGE_ROW: &str = "message_row";
    /// Class marking a row as received.
    pub const INCOMING_MESSAGE_CLASS: &str = "incoming_message_class";
    /// Class marking a row as sent by us.
    pub const OUTGOING_MESSAGE_CLASS: &str = "outgoing_message_class";
    /// The conversation pane as a whole.
    pub const MAIN_PANEL: &str = "main_panel";
    /// Header element carrying the other party's name.
    pub const CONVERSATION_HEADER: &str = "conversation_header";
    /// Clean text node inside a message row.
    pub const MESSAGE_TEXT: &str = "message_text";
}

/// Default selector table for a platform.
pub fn platform_defaults(platform: Platform) -> &'static [(&'static str, &'static str)] {
    match platform {
        Platform::WhatsApp => &[
            (keys::INPUT_FIELD, "footer div[contenteditable=\"true\"]"),
            (keys::MESSAGE_CONTAINER, "#main div[role=\"application\"]"),
            (keys::MESSAGE_ROW, "div.message-in, div.message-out"),
            (keys::INCOMING_MESSAGE_CLASS, "message-in"),
            (keys::OUTGOING_MESSAGE_CLASS, "message-out"),
            (keys::MAIN_PANEL, "#main"),
            (keys::CONVERSATION_HEADER, "#main header span[dir=\"auto\"]"),
            (keys::MESSAGE_TEXT, "span.selectable-text"),
        ],
        Platform::Slack => &[
            (keys::INPUT_FIELD, "div.ql-editor[contenteditable=\"true\"]"),
            (keys::MESSAGE_CONTAINER, "div.c-virtual_list__scroll_container"),
            (keys::MESSAGE_ROW, "div.c-message_kit__background"),
            (keys::INCOMING_MESSAGE_CLASS, "c-message_kit__message"),
            (keys::OUTGOING_MESSAGE_CLASS, "c-message--own"),
            (keys::MAIN_PANEL, "div.p-workspace__primary_view"),
            (keys::CONVERSATION_HEADER, "[data-qa=\"channel_name\"]"),
            (keys::MESSAGE_TEXT, "div.p-rich_text_section"),
        ],
        Platform::LinkedIn => &[
            (keys::INPUT_FIELD, "div.msg-form__contenteditable"),
            (keys::MESSAGE_CONTAINER, "ul.msg-s-message-list-content"),
            (keys::MESSAGE_ROW, "li.msg-s-message-list__event"),
            (keys::INCOMING_MESSAGE_CLASS, "msg-s-event-listitem--other"),
            (keys::OUTGOING_MESSAGE_CLASS, "msg-s-event-listitem--self"),
            (keys::MAIN_PANEL, "div.msg-convo-wrapper"),
            (keys::CONVERSATION_HEADER, "h2.msg-entity-lockup__entity-title"),
            (keys::MESSAGE_TEXT, "p.msg-s-event-listitem__body"),
        ],
        Platform::Fiverr => &[
            (keys::INPUT_FIELD, "textarea[data-qa=\"message-box\"]"),
            (keys::MESSAGE_CONTAINER, "ul.conversation-messages"),
            (keys::MESSAGE_ROW, "li.message-item"),
            (keys::INCOMING_MESSAGE_CLASS, "message-received"),
            (keys::OUTGOING_MESSAGE_CLASS, "message-sent"),
            (keys::MAIN_PANEL, "div.conversation-page"),
            (keys::CONVERSATION_HEADER, "div.conversation-header span.username"),
            (keys::MESSAGE_TEXT, "div.message-body"),
        ],
    }
}

/// Default value for one key, or `""` when the key is unknown.
pub fn default_selector(platform: Platform, key: &str) -> &'static str {
    platform_defaults(platform)
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_platform_has_core_keys() {
        for platform in Platform::ALL {
            for key in [
                keys::INPUT_FIELD,
                keys::MESSAGE_CONTAINER,
                keys::MESSAGE_ROW,
                keys::INCOMING_MESSAGE_CLASS,
                keys::OUTGOING_MESSAGE_CLASS,
                keys::MAIN_PANEL,
                keys::CONVERSATION_HEADER,
                keys::MESSAGE_TEXT,
            ] {
                assert!(
                    !default_selector(platform, key).is_empty(),
                    "{platform} missing default for {key}"
                );
            }
        }
    }

    #[test]
    fn test_unknown_key_is_empty() {
        assert_eq!(default_selector(Platform::WhatsApp, "voice_note_button"), "");
    }
}
