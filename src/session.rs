//! The interactive assist session.
//!
//! Attaches to the first browser tab a platform claims, starts the
//! observer, and joins three inputs in one loop: adapter events, stdin
//! commands and calibration requests raised by failed insertions.

use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use replykit_adapters::cdp::CdpClient;
use replykit_adapters::{AdapterFactory, CdpPageDriver, ObserverConfig};
use replykit_engine::{AssistEngine, ReplyClient};
use replykit_protocols::error::ServiceError;
use replykit_protocols::{
    AdapterEvent, FileKeyValueStore, KeyValueStore, PageDriver, Platform, PlatformAdapter,
    Suggestion,
};
use replykit_selectors::{CalibrationFlow, RemoteSelectorSource, SelectorRegistry};

use crate::config::DaemonConfig;

pub(crate) async fn run(
    config: DaemonConfig,
    endpoint: String,
    auto_insert: bool,
) -> anyhow::Result<()> {
    let store: Arc<dyn KeyValueStore> = Arc::new(
        FileKeyValueStore::open(config.data_dir().join("store.json"))
            .await
            .context("opening local store")?,
    );

    let mut registry = SelectorRegistry::new(store.clone());
    if let Some(url) = &config.selector_source_url {
        registry = registry.with_remote(RemoteSelectorSource::new(url.clone()));
    }
    let registry = Arc::new(registry);
    registry.init().await;

    let engine = Arc::new(
        AssistEngine::load(store.clone(), ReplyClient::new(config.generate_url.clone())).await,
    );
    let settings = engine.settings().await;
    if !settings.enabled {
        bail!("ReplyKit is disabled in settings; enable it and run again");
    }

    // Find the first open tab a platform claims.
    let client = CdpClient::connect(&endpoint)
        .await
        .context("connecting to the browser")?;
    let pages = client.list_pages().await?;
    let Some(target) = pages
        .iter()
        .find(|p| AdapterFactory::resolve(&p.url).is_some())
    else {
        bail!(
            "No supported chat page open. Open one of: {}",
            Platform::ALL.map(|p| p.as_str()).join(", ")
        );
    };
    info!("Attaching to \"{}\" ({})", target.title, target.url);

    let session = Arc::new(client.attach_page(&target.id).await?);
    let page: Arc<dyn PageDriver> = Arc::new(CdpPageDriver::new(session));

    let observer_config = ObserverConfig {
        context_window: settings.effective_window(),
        ..ObserverConfig::default()
    };
    let factory = AdapterFactory::with_config(page.clone(), registry.clone(), observer_config);
    let adapter = factory
        .get()
        .await?
        .expect("target was matched before attach");
    let platform = adapter.platform();
    info!("Using {} adapter", platform);

    adapter.wait_for_load().await?;
    page.install_shortcut_listener().await?;

    // Failed insertions raise calibration requests into the main loop.
    let (cal_tx, mut cal_rx) = mpsc::unbounded_channel::<Platform>();
    adapter.set_calibration_handler(Arc::new(move |platform| {
        let _ = cal_tx.send(platform);
    }));

    let (event_tx, mut events) = mpsc::unbounded_channel();
    adapter.observe_messages(event_tx).await?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut last_suggestion: Option<Suggestion> = None;

    println!("ReplyKit attached to {platform}. Commands: g=regenerate, i=insert, c=calibrate, q=quit");
    println!("In the page, Ctrl/Cmd+Shift+A re-scans the conversation.");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(AdapterEvent::NewMessage(context)) => {
                    println!("\n[{platform}] {}: {}", context.sender_name, context.current_message);
                    match engine.suggest(platform, context).await {
                        Ok(suggestion) => {
                            println!("  -> {}", suggestion.reply);
                            if auto_insert {
                                adapter.insert_text(&suggestion.reply).await?;
                            }
                            last_suggestion = Some(suggestion);
                        }
                        Err(e) => report_service_error(&e),
                    }
                }
                Some(AdapterEvent::ConversationChanged) => {
                    info!("Conversation changed");
                }
                Some(AdapterEvent::Disconnected) | None => {
                    warn!("Page session ended");
                    break;
                }
            },
            requested = cal_rx.recv() => {
                if let Some(platform) = requested {
                    run_calibration(page.clone(), registry.clone(), platform).await;
                }
            },
            line = stdin.next_line() => {
                let Ok(Some(line)) = line else { break };
                match line.trim() {
                    "g" => match engine.regenerate().await {
                        Ok(Some(suggestion)) => {
                            println!("  -> {}", suggestion.reply);
                            last_suggestion = Some(suggestion);
                        }
                        Ok(None) => println!("Nothing extracted yet."),
                        Err(e) => report_service_error(&e),
                    },
                    "i" => match &last_suggestion {
                        Some(suggestion) => adapter.insert_text(&suggestion.reply).await?,
                        None => println!("No suggestion to insert yet."),
                    },
                    "c" => run_calibration(page.clone(), registry.clone(), platform).await,
                    "q" => break,
                    "" => {}
                    other => println!("Unknown command: {other}"),
                }
            },
        }
    }

    adapter.disconnect().await;
    Ok(())
}

async fn run_calibration(
    page: Arc<dyn PageDriver>,
    registry: Arc<SelectorRegistry>,
    platform: Platform,
) {
    println!("Calibration: follow the prompts in the browser window.");
    let flow = CalibrationFlow::new(page, registry, platform);
    match flow.run().await {
        Ok(selector) => println!("Calibrated {platform} input to {selector}; page reloading."),
        Err(e) => println!("Calibration did not complete: {e}"),
    }
}

/// Service failures are the one error class shown to the user as text,
/// with quota exhaustion spelled out so the fix is obvious.
fn report_service_error(error: &ServiceError) {
    match error {
        ServiceError::QuotaExceeded { limit } => {
            match limit {
                Some(limit) => println!(
                    "Usage limit reached ({limit} replies on your plan). Upgrade to keep generating."
                ),
                None => println!("Usage limit reached. Upgrade to keep generating."),
            }
        }
        ServiceError::Unauthenticated => {
            println!("Not signed in. Sign in from the ReplyKit popup and try again.");
        }
        other => println!("Reply generation failed: {other}"),
    }
}
