//! In-memory `PageDriver` for tests.
//!
//! Selector matching is declarative: each element lists the selector
//! strings it should answer to, which keeps tests honest about which
//! chain actually found an element without simulating a CSS engine.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use replykit_protocols::error::PageError;
use replykit_protocols::{DomChange, ElementInfo, NodeRef, PageDriver, PickedElement};

pub struct FakeElement {
    pub info: ElementInfo,
    pub parent: Option<NodeRef>,
    pub matches: Vec<String>,
}

pub struct FakeElementBuilder {
    element: FakeElement,
}

impl FakeElementBuilder {
    pub fn new(node: NodeRef) -> Self {
        Self {
            element: FakeElement {
                info: ElementInfo {
                    node,
                    tag: "div".to_string(),
                    ..Default::default()
                },
                parent: None,
                matches: Vec::new(),
            },
        }
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.element.info.tag = tag.to_string();
        self
    }

    pub fn classes(mut self, classes: &[&str]) -> Self {
        self.element.info.classes = classes.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.element
            .info
            .attributes
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.element.info.text = text.to_string();
        self
    }

    pub fn parent(mut self, parent: NodeRef) -> Self {
        self.element.parent = Some(parent);
        self
    }

    pub fn matches(mut self, selectors: &[&str]) -> Self {
        self.element.matches = selectors.iter().map(|s| s.to_string()).collect();
        self
    }

    fn build(self) -> FakeElement {
        self.element
    }
}

#[derive(Default)]
pub struct FakePage {
    url: Mutex<String>,
    elements: Mutex<Vec<FakeElement>>,
    change_txs: Mutex<Vec<mpsc::UnboundedSender<DomChange>>>,
    closed: AtomicBool,
    manual_trigger: AtomicBool,
    fail_native_insert: AtomicBool,
    pub insertions: Mutex<Vec<(NodeRef, String)>>,
    pub fallback_insertions: Mutex<Vec<(NodeRef, String)>>,
    pub reloads: Mutex<u32>,
}

impl FakePage {
    pub fn new(url: &str) -> Self {
        Self {
            url: Mutex::new(url.to_string()),
            ..Default::default()
        }
    }

    pub fn add(&self, builder: FakeElementBuilder) {
        self.elements.lock().push(builder.build());
    }

    pub fn remove(&self, node: NodeRef) {
        self.elements.lock().retain(|e| e.info.node != node);
    }

    pub fn set_text(&self, node: NodeRef, text: &str) {
        if let Some(element) = self
            .elements
            .lock()
            .iter_mut()
            .find(|e| e.info.node == node)
        {
            element.info.text = text.to_string();
        }
    }

    /// Emit a change tick to every subscriber.
    pub fn emit(&self, change: DomChange) {
        self.change_txs.lock().retain(|tx| tx.send(change).is_ok());
    }

    /// Simulate the tab going away: every subsequent call fails with
    /// `SessionClosed` and the change streams end.
    pub fn close_session(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.change_txs.lock().clear();
    }

    pub fn press_hotkey(&self) {
        self.manual_trigger.store(true, Ordering::SeqCst);
    }

    pub fn fail_native_insert(&self) {
        self.fail_native_insert.store(true, Ordering::SeqCst);
    }

    fn check_open(&self) -> Result<(), PageError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(PageError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn is_descendant_of(&self, elements: &[FakeElement], node: NodeRef, ancestor: NodeRef) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor && id != node {
                return true;
            }
            current = elements
                .iter()
                .find(|e| e.info.node == id)
                .and_then(|e| e.parent);
            if current == Some(id) {
                break;
            }
        }
        false
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn url(&self) -> Result<String, PageError> {
        self.check_open()?;
        Ok(self.url.lock().clone())
    }

    async fn title(&self) -> Result<String, PageError> {
        self.check_open()?;
        Ok("fake".to_string())
    }

    async fn query(&self, selector: &str) -> Result<Vec<ElementInfo>, PageError> {
        self.check_open()?;
        Ok(self
            .elements
            .lock()
            .iter()
            .filter(|e| e.matches.iter().any(|m| m == selector))
            .map(|e| e.info.clone())
            .collect())
    }

    async fn query_within(
        &self,
        node: NodeRef,
        selector: &str,
    ) -> Result<Vec<ElementInfo>, PageError> {
        self.check_open()?;
        let elements = self.elements.lock();
        Ok(elements
            .iter()
            .filter(|e| {
                e.matches.iter().any(|m| m == selector)
                    && self.is_descendant_of(&elements, e.info.node, node)
            })
            .map(|e| e.info.clone())
            .collect())
    }

    async fn inner_text(&self, node: NodeRef) -> Result<String, PageError> {
        self.check_open()?;
        Ok(self
            .elements
            .lock()
            .iter()
            .find(|e| e.info.node == node)
            .map(|e| e.info.text.clone())
            .unwrap_or_default())
    }

    async fn focus(&self, _node: NodeRef) -> Result<(), PageError> {
        self.check_open()
    }

    async fn insert_text(&self, node: NodeRef, text: &str) -> Result<(), PageError> {
        self.check_open()?;
        if self.fail_native_insert.load(Ordering::SeqCst) {
            return Err(PageError::Protocol {
                code: -32000,
                message: "Cannot insert text".to_string(),
            });
        }
        self.insertions.lock().push((node, text.to_string()));
        Ok(())
    }

    async fn set_text_and_notify(&self, node: NodeRef, text: &str) -> Result<(), PageError> {
        self.check_open()?;
        self.fallback_insertions.lock().push((node, text.to_string()));
        Ok(())
    }

    async fn reload(&self) -> Result<(), PageError> {
        self.check_open()?;
        *self.reloads.lock() += 1;
        Ok(())
    }

    async fn subscribe_changes(&self) -> Result<mpsc::UnboundedReceiver<DomChange>, PageError> {
        let (tx, rx) = mpsc::unbounded_channel();
        if !self.closed.load(Ordering::SeqCst) {
            self.change_txs.lock().push(tx);
        }
        Ok(rx)
    }

    async fn show_calibration_intro(&self) -> Result<bool, PageError> {
        self.check_open()?;
        Ok(false)
    }

    async fn await_element_pick(&self) -> Result<PickedElement, PageError> {
        Err(PageError::Javascript("no pick scripted".to_string()))
    }

    async fn show_calibration_done(&self) -> Result<(), PageError> {
        self.check_open()
    }

    async fn install_shortcut_listener(&self) -> Result<(), PageError> {
        self.check_open()
    }

    async fn take_manual_trigger(&self) -> Result<bool, PageError> {
        self.check_open()?;
        Ok(self.manual_trigger.swap(false, Ordering::SeqCst))
    }
}

// ----------------------------------------------------------------------
// Scenario builders
// ----------------------------------------------------------------------

/// Selector strings the WhatsApp rules actually use; elements in scenarios
/// answer to these.
pub const WA_ROWS: &str = "div.message-in, div.message-out";
pub const WA_HEADER: &str = "#main header span[dir=\"auto\"]";
pub const WA_TEXT_PRIMARY: &str = "span.selectable-text span";
pub const WA_TEXT_REGISTRY: &str = "span.selectable-text";
pub const WA_INPUT: &str = "footer div[contenteditable=\"true\"]";
pub const WA_PANEL: &str = "#main";
pub const WA_READY: &str = "#pane-side";
pub const WA_CONTAINER: &str = "#main div[role=\"application\"]";

/// A WhatsApp-style page: ready marker, panel, header, container, compose
/// box. Node IDs 1-5 are taken; message rows start at 100.
pub fn whatsapp_page(sender: &str) -> FakePage {
    let page = FakePage::new("https://web.whatsapp.com/");
    page.add(FakeElementBuilder::new(1).matches(&[WA_READY]));
    page.add(FakeElementBuilder::new(2).matches(&[WA_PANEL]));
    page.add(
        FakeElementBuilder::new(3)
            .tag("span")
            .text(sender)
            .matches(&[WA_HEADER]),
    );
    page.add(FakeElementBuilder::new(4).matches(&[WA_CONTAINER]));
    page.add(
        FakeElementBuilder::new(5)
            .attr("contenteditable", "true")
            .matches(&[WA_INPUT]),
    );
    page
}

/// Append a message row with a clean text span. Returns the row node.
pub fn add_wa_row(page: &FakePage, node: NodeRef, incoming: bool, text: &str) -> NodeRef {
    let class = if incoming { "message-in" } else { "message-out" };
    let raw = format!("{text} 10:42");
    page.add(
        FakeElementBuilder::new(node)
            .classes(&[class])
            .text(&raw)
            .matches(&[WA_ROWS]),
    );
    page.add(
        FakeElementBuilder::new(node + 1)
            .tag("span")
            .text(text)
            .parent(node)
            .matches(&[WA_TEXT_PRIMARY, WA_TEXT_REGISTRY]),
    );
    node
}
