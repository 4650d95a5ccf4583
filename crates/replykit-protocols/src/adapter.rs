//! The platform adapter contract.
//!
//! One adapter instance exists per attached page, owns its observers and
//! timers, and is torn down with [`PlatformAdapter::disconnect`]. The
//! capability set is identical across platforms; only the DOM heuristics
//! behind it differ.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::context::{ChatContext, ExtractOptions};
use crate::error::AdapterError;
use crate::platform::Platform;

/// Events emitted by an adapter's message observer.
#[derive(Debug, Clone)]
pub enum AdapterEvent {
    /// A new qualifying incoming message, with its surrounding context.
    NewMessage(ChatContext),
    /// The active conversation switched (header title changed).
    ConversationChanged,
    /// The page session went away; the adapter has disconnected itself.
    Disconnected,
}

/// Callback invoked when an adapter cannot locate its compose element.
///
/// Invoked at most once per failed insertion; the handler is expected to
/// kick off the calibration flow rather than surface an error.
pub type CalibrationHandler = Arc<dyn Fn(Platform) + Send + Sync>;

/// The scraping/insertion capability set all platforms implement.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// The platform this adapter owns.
    fn platform(&self) -> Platform;

    /// Poll for the platform's "app ready" marker.
    ///
    /// Resolves as soon as any ready selector matches, and resolves `Ok`
    /// anyway once the platform's load timeout elapses: staying attached
    /// and extracting nothing beats hanging forever.
    async fn wait_for_load(&self) -> Result<(), AdapterError>;

    /// Build a [`ChatContext`] from the live DOM.
    ///
    /// Returns `Ok(None)` when no qualifying message is found or when the
    /// latest message was already processed; both are normal outcomes, not
    /// errors. Only a lost page session propagates as `Err`.
    async fn extract_context(
        &self,
        options: ExtractOptions,
    ) -> Result<Option<ChatContext>, AdapterError>;

    /// Write text into the compose box.
    ///
    /// When no compose element can be located, the registered calibration
    /// handler is invoked and the call still returns `Ok`.
    async fn insert_text(&self, text: &str) -> Result<(), AdapterError>;

    /// Start watching the conversation for new messages and conversation
    /// switches, delivering events on `events`. Idempotent per adapter.
    async fn observe_messages(
        &self,
        events: mpsc::UnboundedSender<AdapterEvent>,
    ) -> Result<(), AdapterError>;

    /// Stop all observers and timers. Idempotent; safe to call on an
    /// adapter that never observed anything.
    async fn disconnect(&self);

    /// Register the calibration callback used by [`insert_text`].
    ///
    /// [`insert_text`]: PlatformAdapter::insert_text
    fn set_calibration_handler(&self, handler: CalibrationHandler);
}
