use std::sync::Arc;

use serde_json::json;
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

use replykit_protocols::{KeyValueStore, MemoryKeyValueStore, Platform};

use crate::defaults::keys;
use crate::registry::SelectorRegistry;
use crate::remote::RemoteSelectorSource;

fn registry() -> SelectorRegistry {
    SelectorRegistry::new(Arc::new(MemoryKeyValueStore::new()))
}

#[tokio::test]
async fn test_default_layer_only() {
    let registry = registry();
    let selector = registry
        .get_selector(Platform::WhatsApp, keys::INPUT_FIELD)
        .await;
    assert_eq!(selector, "footer div[contenteditable=\"true\"]");
}

#[tokio::test]
async fn test_unknown_key_empty_never_errors() {
    let registry = registry();
    assert_eq!(registry.get_selector(Platform::Slack, "no_such_key").await, "");
}

#[tokio::test]
async fn test_override_wins_over_default() {
    let registry = registry();
    registry
        .save_user_override(Platform::WhatsApp, keys::INPUT_FIELD, "#x")
        .await
        .unwrap();
    assert_eq!(
        registry.get_selector(Platform::WhatsApp, keys::INPUT_FIELD).await,
        "#x"
    );
    // Other platforms are untouched.
    assert_ne!(registry.get_selector(Platform::Slack, keys::INPUT_FIELD).await, "#x");
}

#[tokio::test]
async fn test_override_survives_remote_refresh_of_other_keys() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "platform": "whatsapp",
                "selector_key": "main_panel",
                "selector_value": "#remote-panel",
                "is_active": true
            },
            {
                "platform": "whatsapp",
                "selector_key": "input_field",
                "selector_value": "#remote-input",
                "is_active": true
            }
        ])))
        .mount(&server)
        .await;

    let registry = SelectorRegistry::new(Arc::new(MemoryKeyValueStore::new()))
        .with_remote(RemoteSelectorSource::new(server.uri()));
    registry
        .save_user_override(Platform::WhatsApp, keys::INPUT_FIELD, "#x")
        .await
        .unwrap();

    registry.init().await;

    // Remote repopulated other keys...
    assert_eq!(
        registry.get_selector(Platform::WhatsApp, keys::MAIN_PANEL).await,
        "#remote-panel"
    );
    // ...but the user override still wins for its key.
    assert_eq!(
        registry.get_selector(Platform::WhatsApp, keys::INPUT_FIELD).await,
        "#x"
    );
}

#[tokio::test]
async fn test_remote_wins_over_default_loses_to_override() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "platform": "linkedin",
                "selector_key": "message_row",
                "selector_value": "li.remote-row",
                "is_active": true
            },
            {
                "platform": "linkedin",
                "selector_key": "message_text",
                "selector_value": ".inactive-row",
                "is_active": false
            }
        ])))
        .mount(&server)
        .await;

    let registry = SelectorRegistry::new(Arc::new(MemoryKeyValueStore::new()))
        .with_remote(RemoteSelectorSource::new(server.uri()));
    registry.init().await;

    assert_eq!(
        registry.get_selector(Platform::LinkedIn, keys::MESSAGE_ROW).await,
        "li.remote-row"
    );
    // Inactive rows are dropped; default stays.
    assert_eq!(
        registry.get_selector(Platform::LinkedIn, keys::MESSAGE_TEXT).await,
        "p.msg-s-event-listitem__body"
    );
}

#[tokio::test]
async fn test_init_swallows_remote_failure() {
    let registry = SelectorRegistry::new(Arc::new(MemoryKeyValueStore::new()))
        .with_remote(RemoteSelectorSource::new("http://127.0.0.1:1/selectors"));
    // Must not error or hang; defaults remain usable.
    registry.init().await;
    assert!(!registry
        .get_selector(Platform::Fiverr, keys::INPUT_FIELD)
        .await
        .is_empty());
}

#[tokio::test]
async fn test_init_is_idempotent() {
    let registry = registry();
    registry
        .save_user_override(Platform::Slack, keys::INPUT_FIELD, "#slack-input")
        .await
        .unwrap();
    registry.init().await;
    registry.init().await;
    assert_eq!(
        registry.get_selector(Platform::Slack, keys::INPUT_FIELD).await,
        "#slack-input"
    );
}

#[tokio::test]
async fn test_overrides_persist_across_registry_instances() {
    let store = Arc::new(MemoryKeyValueStore::new());
    {
        let registry = SelectorRegistry::new(store.clone());
        registry
            .save_user_override(Platform::Fiverr, keys::INPUT_FIELD, "#persisted")
            .await
            .unwrap();
    }

    let store: Arc<dyn KeyValueStore> = store;
    let registry = SelectorRegistry::new(store);
    registry.init().await;
    assert_eq!(
        registry.get_selector(Platform::Fiverr, keys::INPUT_FIELD).await,
        "#persisted"
    );
}

#[tokio::test]
async fn test_get_selectors_merges_layers() {
    let registry = registry();
    registry
        .save_user_override(Platform::WhatsApp, keys::INPUT_FIELD, "#x")
        .await
        .unwrap();

    let config = registry.get_selectors(Platform::WhatsApp).await;
    assert_eq!(config.get(keys::INPUT_FIELD).unwrap(), "#x");
    assert_eq!(config.get(keys::INCOMING_MESSAGE_CLASS).unwrap(), "message-in");
}

#[tokio::test]
async fn test_last_override_in_program_order_wins() {
    let registry = registry();
    registry
        .save_user_override(Platform::WhatsApp, keys::INPUT_FIELD, "#first")
        .await
        .unwrap();
    registry
        .save_user_override(Platform::WhatsApp, keys::INPUT_FIELD, "#second")
        .await
        .unwrap();
    assert_eq!(
        registry.get_selector(Platform::WhatsApp, keys::INPUT_FIELD).await,
        "#second"
    );
}
