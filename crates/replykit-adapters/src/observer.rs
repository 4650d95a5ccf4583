//! Message observation: DOM change stream plus poll fallback.
//!
//! Two sources converge on one debounced extraction: the page's change
//! stream (virtualized lists emit storms of mutations; the debounce
//! collapses each burst into a single pass over the final state) and a
//! slow poll that catches conversation switches whose DOM churn is
//! indistinguishable from ordinary list recycling. The poll also services
//! the in-page manual trigger, which bypasses both the debounce and the
//! duplicate guard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace, warn};

use replykit_protocols::{AdapterEvent, DomChange, ExtractOptions, PageDriver};

use replykit_selectors::{keys, SelectorRegistry};

use crate::extract::{self, ExtractDeps};
use crate::rules::PlatformRules;

/// Observer timing knobs.
#[derive(Debug, Clone)]
pub struct ObserverConfig {
    /// Quiet period after the last change before extraction runs.
    pub debounce: Duration,
    /// Interval of the conversation-switch / manual-trigger poll.
    pub poll_interval: Duration,
    /// Delay between attempts to locate the message container.
    pub container_retry: Duration,
    /// Context window for observer-driven extractions, already clamped.
    pub context_window: usize,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1200),
            poll_interval: Duration::from_secs(1),
            container_retry: Duration::from_secs(2),
            context_window: replykit_protocols::DEFAULT_CONTEXT_WINDOW,
        }
    }
}

/// Everything the observer tasks share with their adapter.
#[derive(Clone)]
pub(crate) struct ObserverParts {
    pub page: Arc<dyn PageDriver>,
    pub registry: Arc<SelectorRegistry>,
    pub rules: Arc<dyn PlatformRules>,
    pub last_processed: Arc<Mutex<Option<String>>>,
    pub connected: Arc<AtomicBool>,
    pub events: mpsc::UnboundedSender<AdapterEvent>,
    pub config: ObserverConfig,
}

/// Spawn the observer tasks. Returned handles are owned by the adapter and
/// aborted on disconnect.
pub(crate) fn spawn(parts: ObserverParts) -> Vec<JoinHandle<()>> {
    let (kick_tx, kick_rx) = mpsc::unbounded_channel();
    let main = tokio::spawn(main_loop(parts.clone(), kick_rx));
    let poll = tokio::spawn(poll_loop(parts, kick_tx));
    vec![main, poll]
}

/// Flip the connected flag and emit `Disconnected` exactly once.
fn mark_disconnected(parts: &ObserverParts) {
    if parts.connected.swap(false, Ordering::SeqCst) {
        debug!("Page session lost, observer stopping");
        let _ = parts.events.send(AdapterEvent::Disconnected);
    }
}

async fn run_extraction(parts: &ObserverParts, force: bool) {
    let options = ExtractOptions {
        context_window: parts.config.context_window,
        force,
    };
    let deps = ExtractDeps {
        page: &*parts.page,
        registry: &parts.registry,
        rules: &*parts.rules,
    };
    match extract::extract_context(&deps, &parts.last_processed, options).await {
        Ok(Some(context)) => {
            let _ = parts.events.send(AdapterEvent::NewMessage(context));
        }
        Ok(None) => {}
        Err(e) if e.is_session_loss() => mark_disconnected(parts),
        Err(e) => warn!("Extraction failed: {}", e),
    }
}

/// Wait for the message container to show up, retrying on a fixed delay.
///
/// Returns `false` only on session loss. Exhausting a bounded retry count
/// proceeds anyway - extraction simply finds nothing until the host page
/// catches up.
async fn wait_for_container(parts: &ObserverParts) -> bool {
    let platform = parts.rules.platform();
    let mut attempt: u32 = 0;
    loop {
        if !parts.connected.load(Ordering::SeqCst) {
            return false;
        }

        let container = parts
            .registry
            .get_selector(platform, keys::MESSAGE_CONTAINER)
            .await;
        let panel = parts.registry.get_selector(platform, keys::MAIN_PANEL).await;
        for selector in [container.as_str(), panel.as_str()] {
            if selector.is_empty() {
                continue;
            }
            match parts.page.query(selector).await {
                Ok(elements) if !elements.is_empty() => return true,
                Ok(_) => {}
                Err(e) if e.is_session_loss() => {
                    mark_disconnected(parts);
                    return false;
                }
                Err(e) => trace!("Container probe {} failed: {}", selector, e),
            }
        }

        attempt += 1;
        if let Some(max) = parts.rules.container_attempts() {
            if attempt >= max {
                warn!(
                    "Message container not found after {} attempts, observing anyway",
                    attempt
                );
                return true;
            }
        }
        sleep(parts.config.container_retry).await;
    }
}

/// Change-stream consumer with debounced extraction.
async fn main_loop(parts: ObserverParts, mut kick_rx: mpsc::UnboundedReceiver<()>) {
    // Subscribe before the container wait so churn during the wait still
    // lands in the first debounce window.
    let mut changes = match parts.page.subscribe_changes().await {
        Ok(rx) => rx,
        Err(_) => {
            mark_disconnected(&parts);
            return;
        }
    };

    if !wait_for_container(&parts).await {
        return;
    }
    debug!("Observer attached for {}", parts.rules.platform());

    let mut pending = false;
    let timer = sleep(parts.config.debounce);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            change = changes.recv() => match change {
                Some(change) => {
                    if change == DomChange::DocumentReplaced {
                        // New document: the old dedupe value describes a
                        // page that no longer exists.
                        parts.last_processed.lock().take();
                    }
                    pending = true;
                    timer.as_mut().reset(Instant::now() + parts.config.debounce);
                }
                None => {
                    mark_disconnected(&parts);
                    break;
                }
            },
            kick = kick_rx.recv() => match kick {
                Some(()) => {
                    pending = true;
                    timer.as_mut().reset(Instant::now() + parts.config.debounce);
                }
                None => break,
            },
            () = &mut timer, if pending => {
                pending = false;
                run_extraction(&parts, false).await;
            }
        }

        if !parts.connected.load(Ordering::SeqCst) {
            break;
        }
    }
}

/// Slow poll: manual trigger servicing plus conversation-switch detection
/// by header title, where the platform needs it.
async fn poll_loop(parts: ObserverParts, kick_tx: mpsc::UnboundedSender<()>) {
    let mut last_title: Option<String> = None;

    loop {
        sleep(parts.config.poll_interval).await;
        if !parts.connected.load(Ordering::SeqCst) {
            break;
        }

        match parts.page.take_manual_trigger().await {
            Ok(true) => {
                debug!("Manual re-scan triggered");
                run_extraction(&parts, true).await;
            }
            Ok(false) => {}
            Err(e) if e.is_session_loss() => {
                mark_disconnected(&parts);
                break;
            }
            Err(e) => trace!("Manual trigger poll failed: {}", e),
        }

        if !parts.rules.watch_conversation_switch() {
            continue;
        }

        let deps = ExtractDeps {
            page: &*parts.page,
            registry: &parts.registry,
            rules: &*parts.rules,
        };
        match extract::resolve_sender(&deps).await {
            Ok(title) => {
                if let Some(previous) = &last_title {
                    if *previous != title {
                        debug!("Conversation switched: {} -> {}", previous, title);
                        parts.last_processed.lock().take();
                        let _ = parts.events.send(AdapterEvent::ConversationChanged);
                        let _ = kick_tx.send(());
                    }
                }
                last_title = Some(title);
            }
            Err(e) if e.is_session_loss() => {
                mark_disconnected(&parts);
                break;
            }
            Err(e) => trace!("Header poll failed: {}", e),
        }
    }
}
