//! The shared extraction algorithm.
//!
//! Every adapter runs the same seven steps over its platform's selectors:
//! resolve the sender, collect rows, classify them, take the last incoming
//! row as the current message, suppress duplicates, slice the preceding
//! context window, assemble. Misses at any step yield `Ok(None)`; only a
//! lost page session is an error, because the caller must stop work rather
//! than wait for the next mutation.

use parking_lot::Mutex;
use tracing::{debug, trace};

use replykit_protocols::error::AdapterError;
use replykit_protocols::{
    clamp_context_window, ChatContext, ElementInfo, ExtractOptions, PageDriver, MIN_MESSAGE_LEN,
};
use replykit_selectors::{keys, SelectorRegistry};

use crate::classify::{classify_row, Direction, DirectionMarkers, RowView};
use crate::rules::PlatformRules;
use crate::text;

/// Shared references the extraction steps need.
pub struct ExtractDeps<'a> {
    pub page: &'a dyn PageDriver,
    pub registry: &'a SelectorRegistry,
    pub rules: &'a dyn PlatformRules,
}

/// Run one extraction pass.
pub async fn extract_context(
    deps: &ExtractDeps<'_>,
    last_processed: &Mutex<Option<String>>,
    options: ExtractOptions,
) -> Result<Option<ChatContext>, AdapterError> {
    let sender = resolve_sender(deps).await?;

    let rows = collect_rows(deps).await?;
    if rows.is_empty() {
        trace!("No message rows found");
        return Ok(None);
    }

    let markers = effective_markers(deps).await;
    let mut classified: Vec<(&ElementInfo, Direction)> = Vec::with_capacity(rows.len());
    for row in &rows {
        let nested = nested_classes(deps, row).await?;
        let view = RowView::from_element(row, nested);
        if let Some(direction) = classify_row(&view, &markers) {
            classified.push((row, direction));
        }
    }

    let Some(current_idx) = classified
        .iter()
        .rposition(|(_, direction)| *direction == Direction::Incoming)
    else {
        trace!("No incoming row among {} classified", classified.len());
        return Ok(None);
    };

    let Some(current) = row_text(deps, classified[current_idx].0).await? else {
        return Ok(None);
    };
    if current.chars().count() < MIN_MESSAGE_LEN {
        return Ok(None);
    }

    // Duplicate suppression: virtualized lists re-announce the same final
    // state many times over. Manual re-scans bypass the guard but still
    // record what they saw.
    {
        let mut last = last_processed.lock();
        if !options.force && last.as_deref() == Some(current.as_str()) {
            trace!("Duplicate of last processed message, suppressing");
            return Ok(None);
        }
        *last = Some(current.clone());
    }

    let window = clamp_context_window(options.context_window as i64);
    let start = current_idx.saturating_sub(window);
    let mut previous = Vec::with_capacity(window);
    for (row, _) in &classified[start..current_idx] {
        if let Some(text) = row_text(deps, row).await? {
            previous.push(text);
        }
    }

    debug!(
        "Extracted message from {} with {} context rows",
        sender,
        previous.len()
    );
    Ok(Some(ChatContext::new(sender, current).with_previous(previous)))
}

/// Resolve the other party's display name, or the platform fallback.
pub async fn resolve_sender(deps: &ExtractDeps<'_>) -> Result<String, AdapterError> {
    let registry_header = deps
        .registry
        .get_selector(deps.rules.platform(), keys::CONVERSATION_HEADER)
        .await;

    let mut candidates: Vec<&str> = Vec::new();
    if !registry_header.is_empty() {
        candidates.push(&registry_header);
    }
    candidates.extend(deps.rules.header_selectors());

    for selector in candidates {
        match deps.page.query(selector).await {
            Ok(elements) => {
                if let Some(name) = text::first_non_empty(elements.iter().map(|e| e.text.as_str()))
                {
                    return Ok(name);
                }
            }
            Err(e) if e.is_session_loss() => return Err(e.into()),
            Err(e) => trace!("Header selector {} failed: {}", selector, e),
        }
    }

    Ok(deps.rules.platform().fallback_sender().to_string())
}

/// Collect message-row candidates: registry selector first, then the
/// platform's fallback chain. First selector with matches wins.
async fn collect_rows(deps: &ExtractDeps<'_>) -> Result<Vec<ElementInfo>, AdapterError> {
    let registry_rows = deps
        .registry
        .get_selector(deps.rules.platform(), keys::MESSAGE_ROW)
        .await;

    let mut candidates: Vec<&str> = Vec::new();
    if !registry_rows.is_empty() {
        candidates.push(&registry_rows);
    }
    candidates.extend(deps.rules.row_selectors());

    for selector in candidates {
        match deps.page.query(selector).await {
            Ok(elements) if !elements.is_empty() => return Ok(elements),
            Ok(_) => {}
            Err(e) if e.is_session_loss() => return Err(e.into()),
            Err(e) => trace!("Row selector {} failed: {}", selector, e),
        }
    }
    Ok(Vec::new())
}

/// Direction markers: platform defaults with registry classes layered in
/// front, so a remote or calibrated class takes priority.
async fn effective_markers(deps: &ExtractDeps<'_>) -> DirectionMarkers {
    let mut markers = deps.rules.direction_markers();
    let platform = deps.rules.platform();

    let incoming = deps
        .registry
        .get_selector(platform, keys::INCOMING_MESSAGE_CLASS)
        .await;
    if !incoming.is_empty() && !markers.incoming_classes.contains(&incoming) {
        markers.incoming_classes.insert(0, incoming);
    }

    let outgoing = deps
        .registry
        .get_selector(platform, keys::OUTGOING_MESSAGE_CLASS)
        .await;
    if !outgoing.is_empty() && !markers.outgoing_classes.contains(&outgoing) {
        markers.outgoing_classes.insert(0, outgoing);
    }

    markers
}

/// Classes found on direction-marked descendants of a row.
async fn nested_classes(
    deps: &ExtractDeps<'_>,
    row: &ElementInfo,
) -> Result<Vec<String>, AdapterError> {
    let selector = deps.rules.nested_marker_selector();
    if selector.is_empty() {
        return Ok(Vec::new());
    }
    match deps.page.query_within(row.node, selector).await {
        Ok(elements) => Ok(elements.into_iter().flat_map(|e| e.classes).collect()),
        Err(e) if e.is_session_loss() => Err(e.into()),
        Err(_) => Ok(Vec::new()),
    }
}

/// Extract clean text for one row: platform text selectors, then generic
/// selectable-text wrappers, then raw row text with noise stripped.
async fn row_text(
    deps: &ExtractDeps<'_>,
    row: &ElementInfo,
) -> Result<Option<String>, AdapterError> {
    let registry_text = deps
        .registry
        .get_selector(deps.rules.platform(), keys::MESSAGE_TEXT)
        .await;

    let mut selectors: Vec<&str> = Vec::new();
    if !registry_text.is_empty() {
        selectors.push(&registry_text);
    }
    selectors.extend(deps.rules.text_selectors());
    selectors.extend(text::GENERIC_TEXT_SELECTORS);

    for selector in selectors {
        match deps.page.query_within(row.node, selector).await {
            Ok(elements) => {
                if let Some(found) =
                    text::first_non_empty(elements.iter().map(|e| e.text.as_str()))
                {
                    return Ok(Some(found));
                }
            }
            Err(e) if e.is_session_loss() => return Err(e.into()),
            Err(_) => {}
        }
    }

    let raw = text::normalize(&row.text);
    Ok(if raw.is_empty() { None } else { Some(raw) })
}

#[cfg(test)]
#[path = "extract_tests.rs"]
mod tests;
