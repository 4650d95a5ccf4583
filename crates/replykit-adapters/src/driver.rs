//! `PageDriver` implementation over a CDP page session.
//!
//! DOM queries go through the DOM domain; the interactive pieces
//! (calibration overlay, hotkey listener, fallback insertion) are small
//! injected scripts polled through `Runtime.evaluate`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::debug;

use replykit_protocols::error::PageError;
use replykit_protocols::{DomChange, ElementInfo, NodeRef, PageDriver, PickedElement};

use crate::cdp::PageSession;

/// Upper bound on elements materialized per query. Message lists can hold
/// thousands of virtualized rows; only the tail matters to extraction.
const MAX_SNAPSHOT: usize = 80;

/// Interval for polling the in-page pick result during calibration.
const PICK_POLL: Duration = Duration::from_millis(250);

/// Installs capture-phase listeners that highlight hovered elements and
/// record the clicked one. Capture at the document level outranks the host
/// page's own handlers, so a calibration click never reaches them.
const PICKER_SCRIPT: &str = r#"
(function() {
    if (window.__replykit_picker) return true;
    window.__replykit_picker = true;
    window.__replykit_pick = null;
    let current = null;
    let saved = '';
    const over = (e) => {
        if (current) current.style.outline = saved;
        current = e.target;
        saved = current.style.outline;
        current.style.outline = '2px solid #4f8ef7';
    };
    const out = () => {
        if (current) { current.style.outline = saved; current = null; }
    };
    const click = (e) => {
        e.preventDefault();
        e.stopPropagation();
        const el = e.target;
        if (current) { current.style.outline = saved; current = null; }
        const attrs = {};
        for (const a of el.attributes) attrs[a.name] = a.value;
        window.__replykit_pick = {
            tag: el.tagName.toLowerCase(),
            id: el.id || null,
            classes: Array.from(el.classList),
            attributes: attrs
        };
        document.removeEventListener('mouseover', over, true);
        document.removeEventListener('mouseout', out, true);
        document.removeEventListener('click', click, true);
        window.__replykit_picker = false;
    };
    document.addEventListener('mouseover', over, true);
    document.addEventListener('mouseout', out, true);
    document.addEventListener('click', click, true);
    return true;
})()
"#;

const PICK_POLL_SCRIPT: &str = r#"
(function() {
    const p = window.__replykit_pick;
    if (p) window.__replykit_pick = null;
    return p ? JSON.stringify(p) : null;
})()
"#;

const HOTKEY_SCRIPT: &str = r#"
(function() {
    if (window.__replykit_hotkey) return true;
    window.__replykit_hotkey = true;
    window.__replykit_trigger = false;
    document.addEventListener('keydown', (e) => {
        if ((e.ctrlKey || e.metaKey) && e.shiftKey && (e.key === 'A' || e.key === 'a')) {
            e.preventDefault();
            window.__replykit_trigger = true;
        }
    }, true);
    return true;
})()
"#;

const TAKE_TRIGGER_SCRIPT: &str = r#"
(function() {
    const t = window.__replykit_trigger === true;
    window.__replykit_trigger = false;
    return t;
})()
"#;

/// Assigns content by the editing model of the target and dispatches a
/// synthetic input event so frameworks tracking the field notice the
/// change. Fallback for inputs where the native insertion command is
/// rejected.
const SET_TEXT_FN: &str = r#"
function(text) {
    if (this.focus) this.focus();
    if (this.isContentEditable) {
        const ok = document.execCommand && document.execCommand('selectAll', false, null)
            && document.execCommand('insertText', false, text);
        if (!ok) this.textContent = text;
    } else if ('value' in this) {
        this.value = text;
    } else {
        this.textContent = text;
    }
    this.dispatchEvent(new InputEvent('input', { bubbles: true, data: text }));
    return true;
}
"#;

const DONE_TOAST_SCRIPT: &str = r#"
(function() {
    const toast = document.createElement('div');
    toast.textContent = 'ReplyKit: input calibrated. Reloading...';
    toast.style.cssText = 'position:fixed;top:16px;right:16px;z-index:2147483647;'
        + 'background:#1f2933;color:#fff;padding:10px 14px;border-radius:6px;'
        + 'font:13px sans-serif;box-shadow:0 2px 8px rgba(0,0,0,.35)';
    document.body.appendChild(toast);
    setTimeout(() => toast.remove(), 4000);
    return true;
})()
"#;

/// `PageDriver` over a CDP page session.
pub struct CdpPageDriver {
    session: Arc<PageSession>,
}

impl CdpPageDriver {
    pub fn new(session: Arc<PageSession>) -> Self {
        Self { session }
    }

    async fn snapshot(&self, node_ids: Vec<i64>) -> Result<Vec<ElementInfo>, PageError> {
        let skip = node_ids.len().saturating_sub(MAX_SNAPSHOT);
        let mut elements = Vec::with_capacity(node_ids.len() - skip);
        for node_id in node_ids.into_iter().skip(skip) {
            let (tag, raw_attrs) = self.session.describe_node(node_id).await?;
            let text = self.session.node_text(node_id).await?;

            let mut id = None;
            let mut classes = Vec::new();
            let mut attributes = BTreeMap::new();
            for pair in raw_attrs.chunks(2) {
                let [name, value] = pair else { continue };
                match name.as_str() {
                    "id" if !value.is_empty() => id = Some(value.clone()),
                    "class" => classes = value.split_whitespace().map(String::from).collect(),
                    _ => {
                        attributes.insert(name.clone(), value.clone());
                    }
                }
            }

            elements.push(ElementInfo {
                node: node_id,
                tag,
                id,
                classes,
                attributes,
                text,
            });
        }
        Ok(elements)
    }
}

#[async_trait]
impl PageDriver for CdpPageDriver {
    async fn url(&self) -> Result<String, PageError> {
        self.session.url().await
    }

    async fn title(&self) -> Result<String, PageError> {
        self.session.title().await
    }

    async fn query(&self, selector: &str) -> Result<Vec<ElementInfo>, PageError> {
        let node_ids = self.session.query_selector_all(None, selector).await?;
        self.snapshot(node_ids).await
    }

    async fn query_within(
        &self,
        node: NodeRef,
        selector: &str,
    ) -> Result<Vec<ElementInfo>, PageError> {
        let node_ids = self.session.query_selector_all(Some(node), selector).await?;
        self.snapshot(node_ids).await
    }

    async fn inner_text(&self, node: NodeRef) -> Result<String, PageError> {
        self.session.node_text(node).await
    }

    async fn focus(&self, node: NodeRef) -> Result<(), PageError> {
        self.session.focus(node).await
    }

    async fn insert_text(&self, node: NodeRef, text: &str) -> Result<(), PageError> {
        self.session.focus(node).await?;
        self.session.insert_text(text).await
    }

    async fn set_text_and_notify(&self, node: NodeRef, text: &str) -> Result<(), PageError> {
        self.session
            .call_on_node(node, SET_TEXT_FN, vec![json!(text)])
            .await?;
        Ok(())
    }

    async fn reload(&self) -> Result<(), PageError> {
        self.session.reload().await
    }

    async fn subscribe_changes(&self) -> Result<mpsc::UnboundedReceiver<DomChange>, PageError> {
        Ok(self.session.subscribe())
    }

    async fn show_calibration_intro(&self) -> Result<bool, PageError> {
        let value = self
            .session
            .evaluate(
                "window.confirm('ReplyKit could not find the message input on this page.\\n\\n\
                 Click OK, then click the input field you type messages into.')",
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn await_element_pick(&self) -> Result<PickedElement, PageError> {
        self.session.evaluate(PICKER_SCRIPT).await?;
        debug!("Element picker installed, waiting for click");

        // No timeout: the flow waits for a human, however long that takes.
        loop {
            tokio::time::sleep(PICK_POLL).await;
            let value = self.session.evaluate(PICK_POLL_SCRIPT).await?;
            let Some(raw) = value.as_str() else { continue };
            let parsed: Value = serde_json::from_str(raw)?;

            let attributes: BTreeMap<String, String> = parsed["attributes"]
                .as_object()
                .map(|obj| {
                    obj.iter()
                        .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                        .collect()
                })
                .unwrap_or_default();

            return Ok(PickedElement {
                tag: parsed["tag"].as_str().unwrap_or("").to_string(),
                id: parsed["id"].as_str().map(String::from),
                classes: parsed["classes"]
                    .as_array()
                    .map(|arr| {
                        arr.iter()
                            .filter_map(|v| v.as_str().map(String::from))
                            .collect()
                    })
                    .unwrap_or_default(),
                attributes,
            });
        }
    }

    async fn show_calibration_done(&self) -> Result<(), PageError> {
        self.session.evaluate(DONE_TOAST_SCRIPT).await?;
        Ok(())
    }

    async fn install_shortcut_listener(&self) -> Result<(), PageError> {
        self.session.evaluate(HOTKEY_SCRIPT).await?;
        Ok(())
    }

    async fn take_manual_trigger(&self) -> Result<bool, PageError> {
        let value = self.session.evaluate(TAKE_TRIGGER_SCRIPT).await?;
        Ok(value.as_bool().unwrap_or(false))
    }
}
