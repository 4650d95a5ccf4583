//! Prompt assembly.

use serde::{Deserialize, Serialize};

use replykit_protocols::ChatContext;

use crate::settings::AssistSettings;

/// One chat-shaped message for the generation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Build the message list for one context.
///
/// The service sees a system message describing the task and one user
/// message carrying the conversation: prior messages (oldest first, as the
/// adapter sliced them) and the message to answer. Prior messages are
/// context only; the reply targets the current message.
pub fn build_messages(context: &ChatContext, settings: &AssistSettings) -> Vec<PromptMessage> {
    let mut system = format!(
        "You are a reply assistant. Draft a reply the user can send as-is. \
         Tone: {}.",
        settings.tone
    );
    if settings.language != "auto" {
        system.push_str(&format!(" Reply in {}.", settings.language));
    }
    if !settings.custom_prompt.is_empty() {
        system.push(' ');
        system.push_str(&settings.custom_prompt);
    }

    let mut conversation = String::new();
    if !context.previous_messages.is_empty() {
        conversation.push_str("Conversation so far:\n");
        for message in &context.previous_messages {
            conversation.push_str("- ");
            conversation.push_str(message);
            conversation.push('\n');
        }
        conversation.push('\n');
    }
    conversation.push_str(&format!(
        "Latest message from {}:\n{}",
        context.sender_name, context.current_message
    ));

    vec![PromptMessage::system(system), PromptMessage::user(conversation)]
}
