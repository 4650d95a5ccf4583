//! Session attached to a single page target.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::SinkExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace};

use replykit_protocols::error::PageError;
use replykit_protocols::DomChange;

use super::client::{PendingRequest, WsSink};
use super::protocol::{CdpRequest, CdpResponse};

/// DOM events that mean "something in the tree changed".
const MUTATION_EVENTS: [&str; 5] = [
    "DOM.childNodeInserted",
    "DOM.childNodeRemoved",
    "DOM.childNodeCountUpdated",
    "DOM.characterDataModified",
    "DOM.attributeModified",
];

/// A session attached to one page target.
///
/// Commands are session-scoped; DOM change events received for the session
/// are fanned out to every subscriber as coarse [`DomChange`] ticks - the
/// observer layer owns debouncing, so fidelity beyond "something changed"
/// would be wasted here.
pub struct PageSession {
    target_id: String,
    session_id: String,
    ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
    pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
    request_id: Arc<AtomicU64>,
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<DomChange>>>>,
    _event_pump: tokio::task::JoinHandle<()>,
}

impl PageSession {
    pub(crate) fn new(
        target_id: String,
        session_id: String,
        ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
        pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
        request_id: Arc<AtomicU64>,
        event_rx: mpsc::UnboundedReceiver<CdpResponse>,
    ) -> Self {
        let subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<DomChange>>>> =
            Arc::new(Mutex::new(Vec::new()));

        let pump = {
            let subscribers = subscribers.clone();
            let session = session_id.clone();
            tokio::spawn(async move {
                Self::event_pump(event_rx, subscribers, session).await;
            })
        };

        Self {
            target_id,
            session_id,
            ws_tx,
            pending,
            request_id,
            subscribers,
            _event_pump: pump,
        }
    }

    async fn event_pump(
        mut event_rx: mpsc::UnboundedReceiver<CdpResponse>,
        subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<DomChange>>>>,
        session_id: String,
    ) {
        while let Some(event) = event_rx.recv().await {
            let Some(method) = event.method.as_deref() else {
                continue;
            };
            let change = if method == "DOM.documentUpdated" {
                Some(DomChange::DocumentReplaced)
            } else if MUTATION_EVENTS.contains(&method) {
                Some(DomChange::Mutated)
            } else if method == "Inspector.detached" {
                break;
            } else {
                None
            };

            if let Some(change) = change {
                // Drop subscribers whose receiver went away.
                subscribers.lock().retain(|tx| tx.send(change).is_ok());
            }
        }

        debug!("Event pump for session {} stopped", session_id);
        // Dropping the senders closes every subscriber's stream, which is
        // how observers learn the page is gone.
        subscribers.lock().clear();
    }

    /// Target ID this session is attached to.
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Send a session-scoped command and wait for the response.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, PageError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: Some(self.session_id.clone()),
        };

        let json = serde_json::to_string(&request)?;
        trace!("CDP session send: {}", json);

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.pending.lock().insert(id, PendingRequest { tx });

        {
            let mut ws = self.ws_tx.lock().await;
            ws.send(Message::Text(json.into()))
                .await
                .map_err(|e| PageError::WebSocket(e.to_string()))?;
        }

        match tokio::time::timeout(std::time::Duration::from_secs(30), rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(PageError::SessionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(PageError::Timeout(format!("Request {method} timed out")))
            }
        }
    }

    /// Enable the domains this session needs.
    pub(crate) async fn enable_domains(&self) -> Result<(), PageError> {
        self.call("Page.enable", None).await?;
        self.call("DOM.enable", None).await?;
        self.call("Runtime.enable", None).await?;
        // DOM child events only flow after the agent has handed out a
        // document; request it once up front.
        self.call("DOM.getDocument", Some(json!({"depth": 0}))).await?;
        debug!("Enabled CDP domains for session {}", self.session_id);
        Ok(())
    }

    /// Subscribe to DOM change ticks. The stream closes when the session
    /// does.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<DomChange> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    // ========================================================================
    // JavaScript
    // ========================================================================

    /// Evaluate an expression and return its value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, PageError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["text"].as_str().unwrap_or("Unknown error");
            return Err(PageError::Javascript(text.to_string()));
        }

        Ok(result["result"]["value"].clone())
    }

    /// Call a function with `this` bound to a DOM node.
    pub async fn call_on_node(
        &self,
        node_id: i64,
        function: &str,
        args: Vec<Value>,
    ) -> Result<Value, PageError> {
        let resolved = self
            .call("DOM.resolveNode", Some(json!({"nodeId": node_id})))
            .await?;
        let object_id = resolved["object"]["objectId"]
            .as_str()
            .ok_or_else(|| PageError::InvalidResponse("Missing objectId".to_string()))?
            .to_string();

        let result = self
            .call(
                "Runtime.callFunctionOn",
                Some(json!({
                    "objectId": object_id,
                    "functionDeclaration": function,
                    "arguments": args.into_iter().map(|v| json!({"value": v})).collect::<Vec<_>>(),
                    "returnByValue": true,
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["text"].as_str().unwrap_or("Unknown error");
            return Err(PageError::Javascript(text.to_string()));
        }

        Ok(result["result"]["value"].clone())
    }

    // ========================================================================
    // DOM
    // ========================================================================

    async fn document_node(&self) -> Result<i64, PageError> {
        let result = self
            .call("DOM.getDocument", Some(json!({"depth": 0})))
            .await?;
        result["root"]["nodeId"]
            .as_i64()
            .ok_or_else(|| PageError::InvalidResponse("Missing document node".to_string()))
    }

    /// All nodes matching `selector`, scoped to `scope` or the document.
    pub async fn query_selector_all(
        &self,
        scope: Option<i64>,
        selector: &str,
    ) -> Result<Vec<i64>, PageError> {
        let scope = match scope {
            Some(node) => node,
            None => self.document_node().await?,
        };

        let result = self
            .call(
                "DOM.querySelectorAll",
                Some(json!({"nodeId": scope, "selector": selector})),
            )
            .await?;

        Ok(result["nodeIds"]
            .as_array()
            .map(|arr| arr.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default())
    }

    /// Tag name and raw attribute list (`[name, value, ...]`) for a node.
    pub async fn describe_node(&self, node_id: i64) -> Result<(String, Vec<String>), PageError> {
        let result = self
            .call("DOM.describeNode", Some(json!({"nodeId": node_id})))
            .await?;

        let tag = result["node"]["nodeName"]
            .as_str()
            .unwrap_or("")
            .to_lowercase();
        let attributes = result["node"]["attributes"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        Ok((tag, attributes))
    }

    /// Visible text of a node.
    pub async fn node_text(&self, node_id: i64) -> Result<String, PageError> {
        let value = self
            .call_on_node(
                node_id,
                "function() { return this.innerText !== undefined ? this.innerText : (this.textContent || ''); }",
                vec![],
            )
            .await?;
        Ok(value.as_str().unwrap_or("").to_string())
    }

    /// Focus a node.
    pub async fn focus(&self, node_id: i64) -> Result<(), PageError> {
        self.call("DOM.focus", Some(json!({"nodeId": node_id})))
            .await?;
        Ok(())
    }

    /// Insert text at the caret via the browser's native input path.
    pub async fn insert_text(&self, text: &str) -> Result<(), PageError> {
        self.call("Input.insertText", Some(json!({"text": text})))
            .await?;
        debug!("Inserted {} characters", text.len());
        Ok(())
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Current page URL.
    pub async fn url(&self) -> Result<String, PageError> {
        let value = self.evaluate("window.location.href").await?;
        Ok(value.as_str().unwrap_or("").to_string())
    }

    /// Current document title.
    pub async fn title(&self) -> Result<String, PageError> {
        let value = self.evaluate("document.title").await?;
        Ok(value.as_str().unwrap_or("").to_string())
    }

    /// Reload the page.
    pub async fn reload(&self) -> Result<(), PageError> {
        self.call("Page.reload", None).await?;
        Ok(())
    }
}

impl Drop for PageSession {
    fn drop(&mut self) {
        self._event_pump.abort();
        self.subscribers.lock().clear();
    }
}
