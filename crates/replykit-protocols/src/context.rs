//! Extracted conversation context and generated suggestions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Smallest context window callers may request.
pub const MIN_CONTEXT_WINDOW: usize = 1;
/// Largest context window callers may request.
pub const MAX_CONTEXT_WINDOW: usize = 10;
/// Context window used when the caller does not specify one.
pub const DEFAULT_CONTEXT_WINDOW: usize = 5;

/// Minimum length of a usable current message after normalization.
/// Anything shorter yields no context at all.
pub const MIN_MESSAGE_LEN: usize = 2;

/// Clamp a requested context window into the supported range.
///
/// Accepts a signed value so that nonsense requests (0, negative, huge)
/// all land inside `[MIN_CONTEXT_WINDOW, MAX_CONTEXT_WINDOW]`.
pub fn clamp_context_window(requested: i64) -> usize {
    requested.clamp(MIN_CONTEXT_WINDOW as i64, MAX_CONTEXT_WINDOW as i64) as usize
}

/// A snapshot of the active conversation, built fresh on every extraction.
///
/// The context is owned by the extraction call that produced it; nothing
/// holds onto one across extractions except the engine's "last context"
/// slot, which the next extraction overwrites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatContext {
    /// Display name of the other party. Falls back to a platform literal
    /// ("Client", "Colleague", "Contact") when the header is unreadable.
    pub sender_name: String,
    /// Normalized text of the most recent qualifying incoming message.
    /// Never empty and never shorter than [`MIN_MESSAGE_LEN`].
    pub current_message: String,
    /// Up to the context window of prior message texts, oldest first.
    /// Used purely as prompt history.
    #[serde(default)]
    pub previous_messages: Vec<String>,
}

impl ChatContext {
    /// Create a context with no history.
    pub fn new(sender_name: impl Into<String>, current_message: impl Into<String>) -> Self {
        Self {
            sender_name: sender_name.into(),
            current_message: current_message.into(),
            previous_messages: Vec::new(),
        }
    }

    /// Attach prior messages (oldest first).
    pub fn with_previous(mut self, previous: Vec<String>) -> Self {
        self.previous_messages = previous;
        self
    }
}

/// Options for a single extraction pass.
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    /// How many prior messages to include, already clamped.
    pub context_window: usize,
    /// Bypass the duplicate-message guard. Used by manual re-scans so a
    /// user-initiated trigger always produces a context if one exists.
    pub force: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            context_window: DEFAULT_CONTEXT_WINDOW,
            force: false,
        }
    }
}

impl ExtractOptions {
    /// Options with a caller-requested window, clamped into range.
    pub fn with_window(requested: i64) -> Self {
        Self {
            context_window: clamp_context_window(requested),
            force: false,
        }
    }

    /// Options for a manual re-scan: default window, dedupe bypassed.
    pub fn forced() -> Self {
        Self {
            force: true,
            ..Self::default()
        }
    }
}

/// Token accounting reported by the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Generations consumed in the current billing window.
    pub used: u32,
    /// Cap for the current plan, if the service reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// A generated reply offered for insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    /// The reply text, ready for the compose box.
    pub reply: String,
    /// Model that produced it.
    pub model: String,
    /// When it was generated.
    pub created_at: DateTime<Utc>,
    /// Usage accounting, when the service reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl Suggestion {
    /// Create a suggestion stamped with the current time.
    pub fn new(reply: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            model: model.into(),
            created_at: Utc::now(),
            usage: None,
        }
    }

    /// Attach usage accounting.
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }
}
