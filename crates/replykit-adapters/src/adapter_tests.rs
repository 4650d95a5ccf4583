use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use replykit_protocols::{
    AdapterEvent, DomChange, ExtractOptions, MemoryKeyValueStore, PageDriver, Platform,
    PlatformAdapter,
};
use replykit_selectors::SelectorRegistry;

use crate::adapter::ChatAdapter;
use crate::observer::ObserverConfig;
use crate::rules::rules_for;
use crate::testpage::{add_wa_row, whatsapp_page, FakePage};

const EVENT_WAIT: Duration = Duration::from_secs(60);

fn adapter_for(page: Arc<FakePage>) -> ChatAdapter {
    let registry = Arc::new(SelectorRegistry::new(Arc::new(MemoryKeyValueStore::new())));
    let page: Arc<dyn PageDriver> = page;
    ChatAdapter::new(
        rules_for(Platform::WhatsApp),
        page,
        registry,
        ObserverConfig::default(),
    )
}

async fn recv_event(
    rx: &mut mpsc::UnboundedReceiver<AdapterEvent>,
) -> Option<AdapterEvent> {
    timeout(EVENT_WAIT, rx.recv()).await.ok().flatten()
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_load_resolves_on_ready_marker() {
    let page = Arc::new(whatsapp_page("Ana"));
    let adapter = adapter_for(page);
    adapter.wait_for_load().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_load_resolves_anyway_after_timeout() {
    // A page with no ready marker at all: the wait must still resolve Ok
    // once the ceiling passes, never hang.
    let page = Arc::new(FakePage::new("https://web.whatsapp.com/"));
    let adapter = adapter_for(page);
    adapter.wait_for_load().await.unwrap();
}

#[tokio::test]
async fn test_insert_text_uses_native_path() {
    let page = Arc::new(whatsapp_page("Ana"));
    let adapter = adapter_for(page.clone());

    adapter.insert_text("sounds good!").await.unwrap();

    let insertions = page.insertions.lock();
    assert_eq!(insertions.len(), 1);
    assert_eq!(insertions[0], (5, "sounds good!".to_string()));
    assert!(page.fallback_insertions.lock().is_empty());
}

#[tokio::test]
async fn test_insert_text_falls_back_to_synthetic_input() {
    let page = Arc::new(whatsapp_page("Ana"));
    page.fail_native_insert();
    let adapter = adapter_for(page.clone());

    adapter.insert_text("sounds good!").await.unwrap();

    assert!(page.insertions.lock().is_empty());
    let fallbacks = page.fallback_insertions.lock();
    assert_eq!(fallbacks.len(), 1);
    assert_eq!(fallbacks[0].1, "sounds good!");
}

#[tokio::test]
async fn test_insert_text_without_compose_invokes_calibration_once() {
    let page = Arc::new(whatsapp_page("Ana"));
    page.remove(5); // compose box gone: selector drift
    let adapter = adapter_for(page.clone());

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    adapter.set_calibration_handler(Arc::new(move |platform| {
        assert_eq!(platform, Platform::WhatsApp);
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    // Must not error, must call the handler exactly once.
    adapter.insert_text("hi").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(page.insertions.lock().is_empty());
}

#[tokio::test]
async fn test_insert_text_without_handler_is_still_ok() {
    let page = Arc::new(whatsapp_page("Ana"));
    page.remove(5);
    let adapter = adapter_for(page);
    adapter.insert_text("hi").await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_observer_debounces_burst_into_one_event() {
    let page = Arc::new(whatsapp_page("Ana"));
    add_wa_row(&page, 100, true, "Hello there");
    let adapter = adapter_for(page.clone());

    let (tx, mut rx) = mpsc::unbounded_channel();
    adapter.observe_messages(tx).await.unwrap();

    // A burst of churn, as a virtualized list would produce.
    for _ in 0..5 {
        page.emit(DomChange::Mutated);
    }

    let event = recv_event(&mut rx).await.expect("expected one event");
    match event {
        AdapterEvent::NewMessage(context) => {
            assert_eq!(context.current_message, "Hello there");
        }
        other => panic!("unexpected event: {other:?}"),
    }

    // The burst collapsed to a single extraction; repeat churn over the
    // same content is deduplicated away entirely.
    for _ in 0..5 {
        page.emit(DomChange::Mutated);
    }
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(rx.try_recv().is_err());

    adapter.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn test_observer_emits_for_new_content_after_dedupe() {
    let page = Arc::new(whatsapp_page("Ana"));
    add_wa_row(&page, 100, true, "Hello there");
    let adapter = adapter_for(page.clone());

    let (tx, mut rx) = mpsc::unbounded_channel();
    adapter.observe_messages(tx).await.unwrap();

    page.emit(DomChange::Mutated);
    assert!(matches!(
        recv_event(&mut rx).await,
        Some(AdapterEvent::NewMessage(_))
    ));

    add_wa_row(&page, 200, true, "Are you still there?");
    page.emit(DomChange::Mutated);

    match recv_event(&mut rx).await {
        Some(AdapterEvent::NewMessage(context)) => {
            assert_eq!(context.current_message, "Are you still there?");
            assert_eq!(context.previous_messages, vec!["Hello there"]);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    adapter.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn test_conversation_switch_detected_by_header_poll() {
    let page = Arc::new(whatsapp_page("Ana"));
    add_wa_row(&page, 100, true, "Hello there");
    let adapter = adapter_for(page.clone());

    let (tx, mut rx) = mpsc::unbounded_channel();
    adapter.observe_messages(tx).await.unwrap();

    // Let the poll record the current title, then switch conversations.
    tokio::time::sleep(Duration::from_secs(3)).await;
    page.set_text(3, "Bob");

    let mut saw_switch = false;
    for _ in 0..3 {
        match recv_event(&mut rx).await {
            Some(AdapterEvent::ConversationChanged) => {
                saw_switch = true;
                break;
            }
            Some(_) => {}
            None => break,
        }
    }
    assert!(saw_switch, "expected a ConversationChanged event");

    adapter.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn test_manual_trigger_bypasses_dedupe() {
    let page = Arc::new(whatsapp_page("Ana"));
    add_wa_row(&page, 100, true, "Hello there");
    let adapter = adapter_for(page.clone());

    let (tx, mut rx) = mpsc::unbounded_channel();
    adapter.observe_messages(tx).await.unwrap();

    page.emit(DomChange::Mutated);
    assert!(matches!(
        recv_event(&mut rx).await,
        Some(AdapterEvent::NewMessage(_))
    ));

    // Same content, but the user asked: the hotkey path must re-deliver.
    page.press_hotkey();
    assert!(matches!(
        recv_event(&mut rx).await,
        Some(AdapterEvent::NewMessage(_))
    ));

    adapter.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn test_session_loss_emits_disconnected_once() {
    let page = Arc::new(whatsapp_page("Ana"));
    let adapter = adapter_for(page.clone());

    let (tx, mut rx) = mpsc::unbounded_channel();
    adapter.observe_messages(tx).await.unwrap();

    page.close_session();

    assert!(matches!(
        recv_event(&mut rx).await,
        Some(AdapterEvent::Disconnected)
    ));
    // Exactly once: both observer tasks notice, one reports.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(rx.try_recv().is_err());

    adapter.disconnect().await;
}

#[tokio::test]
async fn test_observe_messages_is_idempotent() {
    let page = Arc::new(whatsapp_page("Ana"));
    let adapter = adapter_for(page);

    let (tx, _rx) = mpsc::unbounded_channel();
    adapter.observe_messages(tx.clone()).await.unwrap();
    adapter.observe_messages(tx).await.unwrap();

    adapter.disconnect().await;
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let page = Arc::new(whatsapp_page("Ana"));
    let adapter = adapter_for(page);

    let (tx, _rx) = mpsc::unbounded_channel();
    adapter.observe_messages(tx).await.unwrap();

    adapter.disconnect().await;
    adapter.disconnect().await;
}

#[tokio::test]
async fn test_extract_context_delegates() {
    let page = Arc::new(whatsapp_page("Ana"));
    add_wa_row(&page, 100, true, "Hello there");
    let adapter = adapter_for(page);

    let context = adapter
        .extract_context(ExtractOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(context.sender_name, "Ana");
    assert_eq!(context.current_message, "Hello there");
}
