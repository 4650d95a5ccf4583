//! Row direction classification.
//!
//! No platform exposes a single authoritative "is incoming" attribute
//! across every UI state (threads, popouts, responsive variants), so
//! classification runs an explicit ordered list of strategies. The order is
//! part of the observable contract: an outgoing marker found by an earlier
//! strategy always beats the ambiguous-content fallback, which only ever
//! claims a row for incoming when nothing upstream said outgoing.

use std::collections::BTreeMap;

use replykit_protocols::ElementInfo;

/// Message direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// The signals a platform's markup may carry.
#[derive(Debug, Clone, Default)]
pub struct DirectionMarkers {
    /// Classes marking a row (or a nested element) as received.
    pub incoming_classes: Vec<String>,
    /// Classes marking a row (or a nested element) as sent by us.
    pub outgoing_classes: Vec<String>,
    /// Attribute whose value substring identifies received rows,
    /// e.g. `("data-id", "false_")` on WhatsApp.
    pub incoming_attr: Option<(String, String)>,
    /// Attribute whose value substring identifies sent rows.
    pub outgoing_attr: Option<(String, String)>,
}

/// Everything classification sees about one row: its own snapshot plus the
/// class names found on marker-bearing descendants.
#[derive(Debug, Clone, Default)]
pub struct RowView {
    pub classes: Vec<String>,
    pub nested_classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
}

impl RowView {
    pub fn from_element(element: &ElementInfo, nested_classes: Vec<String>) -> Self {
        Self {
            classes: element.classes.clone(),
            nested_classes,
            attributes: element.attributes.clone(),
            text: element.text.clone(),
        }
    }
}

/// Classify one row. `None` means the row is neither: no evidence and no
/// content, e.g. a day separator.
///
/// Strategies in order:
/// 1. explicit class on the row itself
/// 2. class on a nested element
/// 3. identifying attribute value substring
/// 4. ambiguous-with-content: incoming, but only because strategies 1-3
///    found no outgoing evidence first
pub fn classify_row(row: &RowView, markers: &DirectionMarkers) -> Option<Direction> {
    if let Some(direction) = by_row_class(row, markers) {
        return Some(direction);
    }
    if let Some(direction) = by_nested_class(row, markers) {
        return Some(direction);
    }
    if let Some(direction) = by_attribute(row, markers) {
        return Some(direction);
    }
    by_content(row)
}

fn by_row_class(row: &RowView, markers: &DirectionMarkers) -> Option<Direction> {
    match_classes(&row.classes, markers)
}

fn by_nested_class(row: &RowView, markers: &DirectionMarkers) -> Option<Direction> {
    match_classes(&row.nested_classes, markers)
}

fn match_classes(classes: &[String], markers: &DirectionMarkers) -> Option<Direction> {
    // Outgoing first: a row carrying both markers is almost always a
    // quoted/forwarded bubble inside an own message.
    if classes
        .iter()
        .any(|c| markers.outgoing_classes.iter().any(|m| m == c))
    {
        return Some(Direction::Outgoing);
    }
    if classes
        .iter()
        .any(|c| markers.incoming_classes.iter().any(|m| m == c))
    {
        return Some(Direction::Incoming);
    }
    None
}

fn by_attribute(row: &RowView, markers: &DirectionMarkers) -> Option<Direction> {
    if let Some((name, needle)) = &markers.outgoing_attr {
        if row.attributes.get(name).is_some_and(|v| v.contains(needle.as_str())) {
            return Some(Direction::Outgoing);
        }
    }
    if let Some((name, needle)) = &markers.incoming_attr {
        if row.attributes.get(name).is_some_and(|v| v.contains(needle.as_str())) {
            return Some(Direction::Incoming);
        }
    }
    None
}

fn by_content(row: &RowView) -> Option<Direction> {
    if row.text.trim().is_empty() {
        None
    } else {
        Some(Direction::Incoming)
    }
}
