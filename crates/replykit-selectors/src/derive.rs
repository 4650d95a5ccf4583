//! Selector derivation for calibration.
//!
//! Given the element a user clicked, derive the most durable selector we
//! can. IDs and test/ARIA attributes survive host-site redesigns far better
//! than visual class names, so the strategies run in that order; a bare tag
//! name is the last resort.

use replykit_protocols::PickedElement;

/// Attributes considered stable enough to key a selector on, in priority
/// order.
const STABLE_ATTRIBUTES: [&str; 5] = ["data-testid", "data-id", "data-qa", "aria-label", "role"];

/// Class-name tokens that indicate transient UI state rather than identity.
const STATE_TOKENS: [&str; 6] = ["hover", "active", "focus", "focused", "selected", "pressed"];

/// Derive a selector for a picked element.
///
/// Tries, in strict order: `#id`; an attribute-equality selector over the
/// stable attribute list; a dot-joined class selector with state-dependent
/// classes dropped; the tag name.
pub fn derive_selector(element: &PickedElement) -> String {
    if let Some(id) = element.id.as_deref().filter(|id| !id.is_empty()) {
        return format!("#{id}");
    }

    for name in STABLE_ATTRIBUTES {
        if let Some(value) = element.attr(name).filter(|v| !v.is_empty()) {
            return format!("[{name}=\"{value}\"]");
        }
    }

    let stable_classes: Vec<&str> = element
        .classes
        .iter()
        .map(String::as_str)
        .filter(|c| !c.is_empty() && !is_state_class(c))
        .collect();
    if !stable_classes.is_empty() {
        return format!(".{}", stable_classes.join("."));
    }

    let tag = element.tag.trim().to_lowercase();
    if tag.is_empty() {
        "div".to_string()
    } else {
        tag
    }
}

/// Whether a class name is state-dependent.
///
/// A class counts as state-dependent when any `-`/`_`/`:`-separated token
/// equals a known state word, so `hover` and `is-active` are dropped while
/// `interactive` is kept.
fn is_state_class(class: &str) -> bool {
    class
        .split(['-', '_', ':'])
        .any(|token| STATE_TOKENS.contains(&token.to_lowercase().as_str()))
}
