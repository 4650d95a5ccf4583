//! DevTools WebSocket client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};

use replykit_protocols::error::PageError;

use super::protocol::{BrowserVersion, CdpRequest, CdpResponse, PageInfo};
use super::session::PageSession;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Pending command waiting for its response.
pub(crate) struct PendingRequest {
    pub tx: oneshot::Sender<Result<Value, PageError>>,
}

/// Client attached to a running browser's debugging endpoint.
///
/// One WebSocket carries every session's traffic; responses are matched to
/// callers through a pending-request map and events are fanned out to the
/// session they belong to.
pub struct CdpClient {
    /// HTTP endpoint for target discovery.
    http_endpoint: String,
    /// WebSocket sender, shared with sessions.
    ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
    /// Command ID counter, shared with sessions.
    request_id: Arc<AtomicU64>,
    /// Pending commands, shared with sessions.
    pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
    /// Event routing by session ID.
    #[allow(clippy::type_complexity)]
    event_handlers: Arc<RwLock<HashMap<String, mpsc::UnboundedSender<CdpResponse>>>>,
    /// Background receive task.
    _recv_task: tokio::task::JoinHandle<()>,
}

impl std::fmt::Debug for CdpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdpClient")
            .field("http_endpoint", &self.http_endpoint)
            .finish_non_exhaustive()
    }
}

impl CdpClient {
    /// Connect to a browser at `endpoint` (e.g. `http://localhost:9222`).
    pub async fn connect(endpoint: &str) -> Result<Self, PageError> {
        let http_endpoint = endpoint.trim_end_matches('/').to_string();
        url::Url::parse(&http_endpoint)
            .map_err(|e| PageError::ConnectionFailed(format!("Invalid endpoint: {e}")))?;

        let version_url = format!("{http_endpoint}/json/version");
        debug!("Fetching browser version from {}", version_url);

        let version: BrowserVersion = reqwest::get(&version_url)
            .await
            .map_err(|e| PageError::BrowserNotAvailable(format!("{endpoint}: {e}")))?
            .json()
            .await
            .map_err(|e| PageError::BrowserNotAvailable(format!("{endpoint}: {e}")))?;

        debug!("Connected to browser: {}", version.browser);

        let (ws_stream, _) = tokio_tungstenite::connect_async(&version.web_socket_debugger_url)
            .await
            .map_err(|e| PageError::ConnectionFailed(format!("WebSocket: {e}")))?;

        let (ws_sink, ws_source) = ws_stream.split();
        let ws_tx = Arc::new(tokio::sync::Mutex::new(ws_sink));
        let pending: Arc<Mutex<HashMap<u64, PendingRequest>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let event_handlers: Arc<RwLock<HashMap<String, mpsc::UnboundedSender<CdpResponse>>>> =
            Arc::new(RwLock::new(HashMap::new()));

        let recv_task = {
            let pending = pending.clone();
            let event_handlers = event_handlers.clone();
            tokio::spawn(async move {
                Self::receive_loop(ws_source, pending, event_handlers).await;
            })
        };

        Ok(Self {
            http_endpoint,
            ws_tx,
            request_id: Arc::new(AtomicU64::new(1)),
            pending,
            event_handlers,
            _recv_task: recv_task,
        })
    }

    async fn receive_loop(
        mut ws_source: WsSource,
        pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
        event_handlers: Arc<RwLock<HashMap<String, mpsc::UnboundedSender<CdpResponse>>>>,
    ) {
        while let Some(msg) = ws_source.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    trace!("CDP recv: {}", text);
                    match serde_json::from_str::<CdpResponse>(&text) {
                        Ok(resp) => {
                            if let Some(id) = resp.id {
                                if let Some(req) = pending.lock().remove(&id) {
                                    let result = match resp.error {
                                        Some(error) => Err(PageError::Protocol {
                                            code: error.code,
                                            message: error.message,
                                        }),
                                        None => Ok(resp.result.unwrap_or(Value::Null)),
                                    };
                                    let _ = req.tx.send(result);
                                }
                            } else if resp.method.is_some() {
                                let session_id = resp.session_id.clone().unwrap_or_default();
                                let handlers = event_handlers.read().await;
                                if let Some(tx) = handlers.get(&session_id) {
                                    let _ = tx.send(resp);
                                }
                            }
                        }
                        Err(e) => warn!("Failed to parse CDP message: {}", e),
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("WebSocket closed");
                    break;
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }

        // The socket is gone: fail every caller still waiting and drop the
        // event routes so sessions observe the loss too.
        let waiters: Vec<PendingRequest> = pending.lock().drain().map(|(_, req)| req).collect();
        for req in waiters {
            let _ = req.tx.send(Err(PageError::SessionClosed));
        }
        event_handlers.write().await.clear();
    }

    /// Send a browser-level command and wait for the response.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, PageError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: None,
        };

        let json = serde_json::to_string(&request)?;
        trace!("CDP send: {}", json);

        let (tx, rx) = oneshot::channel();
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

    /// List open page targets via the discovery endpoint.
    pub async fn list_pages(&self) -> Result<Vec<PageInfo>, PageError> {
        let url = format!("{}/json/list", self.http_endpoint);
        let pages: Vec<PageInfo> = reqwest::get(&url)
            .await
            .map_err(|e| PageError::Http(e.to_string()))?
            .json()
            .await
            .map_err(|e| PageError::Http(e.to_string()))?;
        Ok(pages.into_iter().filter(|p| p.page_type == "page").collect())
    }

    /// Attach to an existing page target.
    pub async fn attach_page(&self, target_id: &str) -> Result<PageSession, PageError> {
        let result = self
            .call(
                "Target.attachToTarget",
                Some(json!({"targetId": target_id, "flatten": true})),
            )
            .await?;

        let session_id = result["sessionId"]
            .as_str()
            .ok_or_else(|| PageError::InvalidResponse("Missing sessionId".to_string()))?
            .to_string();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        self.event_handlers
            .write()
            .await
            .insert(session_id.clone(), event_tx);

        let session = PageSession::new(
            target_id.to_string(),
            session_id,
            self.ws_tx.clone(),
            self.pending.clone(),
            self.request_id.clone(),
            event_rx,
        );
        session.enable_domains().await?;

        debug!("Attached to target {}", target_id);
        Ok(session)
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self._recv_task.abort();
    }
}
