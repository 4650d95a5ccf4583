//! Local key-value persistence.
//!
//! Settings, selector overrides, the remote selector cache and the response
//! cache all go through one flat string-to-JSON store. The file-backed
//! implementation keeps the whole document in memory and rewrites it
//! atomically on every mutation; the in-memory implementation backs tests
//! and ephemeral runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::StoreError;

/// Flat key-value store with JSON values.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the given keys. Missing keys are simply absent from the result.
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StoreError>;

    /// Upsert all entries.
    async fn set(&self, entries: HashMap<String, Value>) -> Result<(), StoreError>;

    /// Delete the given keys. Deleting a missing key is not an error.
    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError>;

    /// Fetch a single key.
    async fn get_one(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.get(&[key]).await?.remove(key))
    }

    /// Upsert a single entry.
    async fn set_one(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.set(HashMap::from([(key.to_string(), value)])).await
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StoreError> {
        let entries = self.entries.read().await;
        Ok(keys
            .iter()
            .filter_map(|k| entries.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, new_entries: HashMap<String, Value>) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.extend(new_entries);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

/// File-backed store: one JSON document, rewritten atomically.
///
/// ```text
/// {data_dir}/
/// └── store.json
/// ```
///
/// The document is loaded once at open; every mutation updates the
/// in-memory map first and then persists via a temp-file rename, so a
/// crash mid-write never leaves a truncated document behind.
pub struct FileKeyValueStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, Value>>,
}

impl FileKeyValueStore {
    /// Open (or create) the store at `path`.
    ///
    /// A missing file starts empty. A corrupt file is logged and treated
    /// as empty rather than refusing to start; the next write replaces it.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let entries = match fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(map) => map,
                Err(e) => {
                    warn!("Store at {} is corrupt ({}), starting empty", path.display(), e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!("Opened store at {} ({} entries)", path.display(), entries.len());
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    async fn persist(&self, entries: &HashMap<String, Value>) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StoreError> {
        let entries = self.entries.read().await;
        Ok(keys
            .iter()
            .filter_map(|k| entries.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, new_entries: HashMap<String, Value>) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.extend(new_entries);
        self.persist(&entries).await
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(*key);
        }
        self.persist(&entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryKeyValueStore::new();
        store.set_one("tone", json!("friendly")).await.unwrap();

        let value = store.get_one("tone").await.unwrap();
        assert_eq!(value, Some(json!("friendly")));
    }

    #[tokio::test]
    async fn test_memory_store_missing_keys_absent() {
        let store = MemoryKeyValueStore::new();
        store.set_one("a", json!(1)).await.unwrap();

        let result = store.get(&["a", "b"]).await.unwrap();
        assert_eq!(result.len(), 1);
        assert!(!result.contains_key("b"));
    }

    #[tokio::test]
    async fn test_memory_store_remove() {
        let store = MemoryKeyValueStore::new();
        store.set_one("a", json!(1)).await.unwrap();
        store.remove(&["a", "never-existed"]).await.unwrap();
        assert_eq!(store.get_one("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileKeyValueStore::open(&path).await.unwrap();
        store.set_one("key", json!({"nested": true})).await.unwrap();
        drop(store);

        let reopened = FileKeyValueStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get_one("key").await.unwrap(),
            Some(json!({"nested": true}))
        );
    }

    #[tokio::test]
    async fn test_file_store_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::open(dir.path().join("fresh.json"))
            .await
            .unwrap();
        assert_eq!(store.get_one("anything").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileKeyValueStore::open(&path).await.unwrap();
        assert_eq!(store.get_one("anything").await.unwrap(), None);

        // The next write replaces the corrupt document.
        store.set_one("a", json!(1)).await.unwrap();
        let reopened = FileKeyValueStore::open(&path).await.unwrap();
        assert_eq!(reopened.get_one("a").await.unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_file_store_no_tmp_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = FileKeyValueStore::open(&path).await.unwrap();
        store.set_one("a", json!(1)).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["store.json".to_string()]);
    }
}
