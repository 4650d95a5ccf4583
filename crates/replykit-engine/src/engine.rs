//! The assist engine: contexts in, suggestions out.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use replykit_protocols::error::{ServiceError, StoreError};
use replykit_protocols::{ChatContext, KeyValueStore, Platform, Suggestion};

use crate::cache::ResponseCache;
use crate::generate::{ReplyClient, ReplyRequest};
use crate::prompt::build_messages;
use crate::settings::AssistSettings;

const LAST_CONTEXT_KEY: &str = "last_context";

/// The most recent extraction, kept for "regenerate".
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LastContext {
    platform: Platform,
    context: ChatContext,
}

/// Orchestrates settings, caching and the generation service.
///
/// Suggestions for identical requests are served from the response cache;
/// `regenerate` deliberately skips the cache read so the user gets a fresh
/// attempt, and overwrites the cached entry with it.
pub struct AssistEngine {
    store: Arc<dyn KeyValueStore>,
    client: ReplyClient,
    settings: RwLock<AssistSettings>,
    cache: Mutex<ResponseCache>,
    last_context: Mutex<Option<LastContext>>,
}

impl AssistEngine {
    /// Build an engine, loading settings, cache and last context from the
    /// store.
    pub async fn load(store: Arc<dyn KeyValueStore>, client: ReplyClient) -> Self {
        let settings = AssistSettings::load(&*store).await;
        let cache = ResponseCache::load(&*store).await;
        let last_context = match store.get_one(LAST_CONTEXT_KEY).await {
            Ok(Some(value)) => serde_json::from_value(value).ok(),
            _ => None,
        };

        Self {
            store,
            client,
            settings: RwLock::new(settings),
            cache: Mutex::new(cache),
            last_context: Mutex::new(last_context),
        }
    }

    /// Current settings snapshot.
    pub async fn settings(&self) -> AssistSettings {
        self.settings.read().await.clone()
    }

    /// Replace settings and persist them.
    pub async fn update_settings(&self, settings: AssistSettings) -> Result<(), StoreError> {
        settings.save(&*self.store).await?;
        *self.settings.write().await = settings;
        Ok(())
    }

    /// Suggest a reply for a freshly extracted context.
    pub async fn suggest(
        &self,
        platform: Platform,
        context: ChatContext,
    ) -> Result<Suggestion, ServiceError> {
        self.remember_context(platform, &context).await;

        let settings = self.settings().await;
        let key = ResponseCache::key(
            platform,
            &context.current_message,
            &settings.tone,
            &settings.model,
        );

        if let Some(cached) = self.cache.lock().await.get(&key) {
            debug!("Serving cached reply for {}", platform);
            return Ok(cached.clone());
        }

        let suggestion = self.generate(&context, &settings).await?;
        self.cache_reply(key, suggestion.clone()).await;
        Ok(suggestion)
    }

    /// Re-run generation for the last extracted context, skipping the
    /// cache read. `None` when nothing has been extracted yet.
    pub async fn regenerate(&self) -> Result<Option<Suggestion>, ServiceError> {
        let Some(last) = self.last_context.lock().await.clone() else {
            return Ok(None);
        };

        let settings = self.settings().await;
        let suggestion = self.generate(&last.context, &settings).await?;

        let key = ResponseCache::key(
            last.platform,
            &last.context.current_message,
            &settings.tone,
            &settings.model,
        );
        self.cache_reply(key, suggestion.clone()).await;
        Ok(Some(suggestion))
    }

    async fn generate(
        &self,
        context: &ChatContext,
        settings: &AssistSettings,
    ) -> Result<Suggestion, ServiceError> {
        let request = ReplyRequest {
            messages: build_messages(context, settings),
            tone: settings.tone.clone(),
            prompt: settings.custom_prompt.clone(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
        };
        self.client.generate(&request).await
    }

    /// The next extraction overwrites the previous one; only the latest
    /// context is ever kept.
    async fn remember_context(&self, platform: Platform, context: &ChatContext) {
        let last = LastContext {
            platform,
            context: context.clone(),
        };
        *self.last_context.lock().await = Some(last.clone());

        match serde_json::to_value(&last) {
            Ok(value) => {
                if let Err(e) = self.store.set_one(LAST_CONTEXT_KEY, value).await {
                    warn!("Failed to persist last context: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize last context: {}", e),
        }
    }

    async fn cache_reply(&self, key: String, suggestion: Suggestion) {
        let mut cache = self.cache.lock().await;
        cache.insert(key, suggestion);
        if let Err(e) = cache.save(&*self.store).await {
            warn!("Failed to persist response cache: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
