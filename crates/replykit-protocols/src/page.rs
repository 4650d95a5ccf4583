//! The page seam: everything an adapter may do to a live page.
//!
//! Adapters never touch the DevTools protocol directly; they speak this
//! trait. The production implementation drives a Chromium page over CDP,
//! the test implementation serves canned element trees.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::PageError;

/// Opaque handle to a DOM node, valid while the page stays attached.
pub type NodeRef = i64;

/// A flat snapshot of one DOM element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementInfo {
    pub node: NodeRef,
    /// Lowercase tag name.
    pub tag: String,
    /// The `id` attribute, if present and non-empty.
    pub id: Option<String>,
    /// Class list, in document order.
    pub classes: Vec<String>,
    /// Remaining attributes, name to value.
    pub attributes: BTreeMap<String, String>,
    /// Visible text content, whitespace-collapsed.
    pub text: String,
}

impl ElementInfo {
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// An element chosen by the user during calibration. Same shape as
/// [`ElementInfo`] minus the node handle: the pick outlives the node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PickedElement {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
}

impl PickedElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// A change notification from the live page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomChange {
    /// Child nodes were inserted, removed or replaced somewhere in the tree.
    Mutated,
    /// The document was replaced wholesale (navigation, full SPA rerender).
    DocumentReplaced,
}

/// Low-level access to the attached page.
///
/// Element misses are not errors: a selector that matches nothing yields an
/// empty result. `Err` is reserved for the transport layer, and
/// [`PageError::SessionClosed`] in particular means the page is gone for
/// good and callers should stop work.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Current page URL.
    async fn url(&self) -> Result<String, PageError>;

    /// Current document title.
    async fn title(&self) -> Result<String, PageError>;

    /// All elements matching a CSS selector, in document order.
    async fn query(&self, selector: &str) -> Result<Vec<ElementInfo>, PageError>;

    /// All elements matching a CSS selector underneath `node`.
    async fn query_within(
        &self,
        node: NodeRef,
        selector: &str,
    ) -> Result<Vec<ElementInfo>, PageError>;

    /// Visible text of a node (innerText semantics).
    async fn inner_text(&self, node: NodeRef) -> Result<String, PageError>;

    /// Give a node input focus.
    async fn focus(&self, node: NodeRef) -> Result<(), PageError>;

    /// Insert text at the caret using the browser's native insertion
    /// command. Works for plain inputs and contenteditable alike.
    async fn insert_text(&self, node: NodeRef, text: &str) -> Result<(), PageError>;

    /// Fallback insertion: assign content directly and dispatch a synthetic
    /// input event so the page's own state management picks up the change.
    async fn set_text_and_notify(&self, node: NodeRef, text: &str) -> Result<(), PageError>;

    /// Reload the page.
    async fn reload(&self) -> Result<(), PageError>;

    /// Subscribe to change notifications. Each call returns an independent
    /// stream; the sender side closes when the page session does.
    async fn subscribe_changes(&self) -> Result<mpsc::UnboundedReceiver<DomChange>, PageError>;

    // ------------------------------------------------------------------
    // Calibration surface
    // ------------------------------------------------------------------

    /// Show the calibration intro dialog. Returns whether the user chose
    /// to proceed.
    async fn show_calibration_intro(&self) -> Result<bool, PageError>;

    /// Put the page into element-picking mode and wait for a click.
    /// Waits indefinitely; there is deliberately no timeout on a human.
    async fn await_element_pick(&self) -> Result<PickedElement, PageError>;

    /// Show the calibration success notice.
    async fn show_calibration_done(&self) -> Result<(), PageError>;

    // ------------------------------------------------------------------
    // Manual trigger
    // ------------------------------------------------------------------

    /// Install the in-page keyboard listener (Ctrl/Cmd+Shift+A).
    async fn install_shortcut_listener(&self) -> Result<(), PageError>;

    /// Consume a pending manual trigger, if the shortcut fired since the
    /// last call.
    async fn take_manual_trigger(&self) -> Result<bool, PageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_info_has_class() {
        let el = ElementInfo {
            classes: vec!["message-in".to_string(), "focusable".to_string()],
            ..Default::default()
        };
        assert!(el.has_class("message-in"));
        assert!(!el.has_class("message-out"));
    }

    #[test]
    fn test_element_info_attr() {
        let mut attributes = BTreeMap::new();
        attributes.insert("data-id".to_string(), "false_123@c.us".to_string());
        let el = ElementInfo {
            attributes,
            ..Default::default()
        };
        assert_eq!(el.attr("data-id"), Some("false_123@c.us"));
        assert_eq!(el.attr("data-testid"), None);
    }
}
