//! Durable single-slot store for the pending dispense intent.
//!
//! The store is the only flow state that outlives a full-page navigation to
//! the hosted identity provider and back. It holds at most one intent as a
//! JSON blob under a fixed key: saves overwrite unconditionally, and
//! `take_and_clear` consumes the slot exactly once. A corrupt or expired
//! value is indistinguishable from an empty slot.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Fixed key the pending intent lives under.
pub const PENDING_INTENT_KEY: &str = "pending_dispense";

/// A note-to-self that lets the flow resume dispensing after sign-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingIntent {
    pub machine_id: String,
    pub display_location: String,
    pub created_at: DateTime<Utc>,
}

impl PendingIntent {
    pub fn new(machine_id: impl Into<String>, display_location: impl Into<String>) -> Self {
        Self {
            machine_id: machine_id.into(),
            display_location: display_location.into(),
            created_at: Utc::now(),
        }
    }
}

/// Injected persistence seam: get/set/delete by key, nothing global.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key).await
    }
}

/// Volatile store for tests and short-lived tools.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// File-backed store: one JSON object per file, surviving restarts.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_map(&self) -> HashMap<String, String> {
        match tokio::fs::read_to_string(&self.path).await {
            // An unreadable or corrupt file behaves like an empty store.
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            Err(_) => HashMap::new(),
        }
    }

    async fn write_map(&self, map: &HashMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string(map)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_map().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.read_map().await;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut map = self.read_map().await;
        if map.remove(key).is_some() {
            self.write_map(&map).await?;
        }
        Ok(())
    }
}

/// Single-slot pending-intent store over any [`KeyValueStore`].
pub struct PendingIntentStore<S: KeyValueStore> {
    store: S,
    ttl_seconds: Option<i64>,
    // Serializes save/take so a race resolves to one of the two values.
    slot: Mutex<()>,
}

impl<S: KeyValueStore> PendingIntentStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            ttl_seconds: None,
            slot: Mutex::new(()),
        }
    }

    /// Treat intents older than `ttl_seconds` as absent.
    pub fn with_ttl(mut self, ttl_seconds: i64) -> Self {
        self.ttl_seconds = Some(ttl_seconds);
        self
    }

    /// Overwrites any existing intent unconditionally; last write wins.
    pub async fn save(&self, intent: &PendingIntent) -> Result<()> {
        let _guard = self.slot.lock().await;
        let value = serde_json::to_string(intent)?;
        self.store.set(PENDING_INTENT_KEY, &value).await
    }

    /// Atomically reads and deletes the stored intent.
    ///
    /// A second call immediately after always returns `None`. Corrupt and
    /// expired values are cleared and reported as absent.
    pub async fn take_and_clear(&self) -> Option<PendingIntent> {
        let _guard = self.slot.lock().await;
        let raw = self.store.get(PENDING_INTENT_KEY).await.ok().flatten()?;

        // The slot is consumed no matter what the value turns out to be.
        if let Err(error) = self.store.delete(PENDING_INTENT_KEY).await {
            tracing::warn!("Failed to clear pending intent: {}", error);
        }

        let intent: PendingIntent = serde_json::from_str(&raw).ok()?;

        if let Some(ttl) = self.ttl_seconds {
            if (Utc::now() - intent.created_at).num_seconds() > ttl {
                return None;
            }
        }

        Some(intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn take_and_clear_consumes_exactly_once() {
        let store = PendingIntentStore::new(MemoryStore::new());
        store
            .save(&PendingIntent::new("007", "Plaza Central"))
            .await
            .unwrap();

        let first = store.take_and_clear().await.unwrap();
        assert_eq!(first.machine_id, "007");
        assert!(store.take_and_clear().await.is_none());
    }

    #[tokio::test]
    async fn save_overwrites_last_write_wins() {
        let store = PendingIntentStore::new(MemoryStore::new());
        store.save(&PendingIntent::new("A", "north")).await.unwrap();
        store.save(&PendingIntent::new("B", "south")).await.unwrap();

        let taken = store.take_and_clear().await.unwrap();
        assert_eq!(taken.machine_id, "B");
        assert_eq!(taken.display_location, "south");
    }

    #[tokio::test]
    async fn corrupt_value_is_cleared_and_absent() {
        let inner = MemoryStore::new();
        inner.set(PENDING_INTENT_KEY, "{not json").await.unwrap();

        let store = PendingIntentStore::new(inner);
        assert!(store.take_and_clear().await.is_none());
        assert!(store.take_and_clear().await.is_none());
    }

    #[tokio::test]
    async fn expired_intent_is_treated_as_absent() {
        let store = PendingIntentStore::new(MemoryStore::new()).with_ttl(60);
        let mut intent = PendingIntent::new("007", "Plaza Central");
        intent.created_at = Utc::now() - chrono::Duration::seconds(120);
        store.save(&intent).await.unwrap();

        assert!(store.take_and_clear().await.is_none());
    }

    #[tokio::test]
    async fn fresh_intent_survives_ttl_check() {
        let store = PendingIntentStore::new(MemoryStore::new()).with_ttl(60);
        store.save(&PendingIntent::new("007", "plaza")).await.unwrap();
        assert!(store.take_and_clear().await.is_some());
    }

    #[tokio::test]
    async fn file_store_survives_a_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiosk-state.json");

        let store = PendingIntentStore::new(FileStore::new(&path));
        store
            .save(&PendingIntent::new("007", "Plaza Central"))
            .await
            .unwrap();

        // A fresh store over the same file sees the intent, then clears it.
        let reopened = PendingIntentStore::new(FileStore::new(&path));
        let taken = reopened.take_and_clear().await.unwrap();
        assert_eq!(taken.machine_id, "007");
        assert!(reopened.take_and_clear().await.is_none());
    }
}
