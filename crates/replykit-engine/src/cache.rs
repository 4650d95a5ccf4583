//! Capped response cache.
//!
//! Keyed on everything that influences a generation: platform, message,
//! tone, model. Bounded at [`RESPONSE_CACHE_CAP`] entries; inserting past
//! the cap drops the oldest entry, nothing else.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::warn;

use replykit_protocols::error::StoreError;
use replykit_protocols::{KeyValueStore, Platform, Suggestion};

/// Maximum number of cached replies.
pub const RESPONSE_CACHE_CAP: usize = 50;

const CACHE_KEY: &str = "response_cache";

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDoc {
    /// Oldest first.
    entries: Vec<(String, Suggestion)>,
}

/// In-memory cache with insertion-order eviction.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: HashMap<String, Suggestion>,
    order: VecDeque<String>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for one generation request.
    pub fn key(platform: Platform, message: &str, tone: &str, model: &str) -> String {
        format!("{}|{}|{}|{}", platform, tone, model, message)
    }

    pub fn get(&self, key: &str) -> Option<&Suggestion> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert, evicting the oldest entry once the cap is exceeded.
    pub fn insert(&mut self, key: String, suggestion: Suggestion) {
        if !self.entries.contains_key(&key) {
            self.order.push_back(key.clone());
        }
        self.entries.insert(key, suggestion);

        while self.order.len() > RESPONSE_CACHE_CAP {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    /// The oldest cached key, if any.
    pub fn oldest_key(&self) -> Option<&str> {
        self.order.front().map(String::as_str)
    }

    /// Load the cache from the store; unreadable documents start empty.
    pub async fn load(store: &dyn KeyValueStore) -> Self {
        let doc = match store.get_one(CACHE_KEY).await {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|e| {
                warn!("Stored response cache unreadable ({}), starting empty", e);
                CacheDoc::default()
            }),
            Ok(None) => CacheDoc::default(),
            Err(e) => {
                warn!("Failed to load response cache ({}), starting empty", e);
                CacheDoc::default()
            }
        };

        let mut cache = Self::new();
        for (key, suggestion) in doc.entries {
            cache.insert(key, suggestion);
        }
        cache
    }

    /// Persist the cache, oldest first.
    pub async fn save(&self, store: &dyn KeyValueStore) -> Result<(), StoreError> {
        let doc = CacheDoc {
            entries: self
                .order
                .iter()
                .filter_map(|k| self.entries.get(k).map(|s| (k.clone(), s.clone())))
                .collect(),
        };
        store.set_one(CACHE_KEY, serde_json::to_value(&doc)?).await
    }
}
