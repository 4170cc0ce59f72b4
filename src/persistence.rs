//! Persisted key/value state
//!
//! Daily counters survive restarts through a retained key/value store. The
//! production store is the MQTT broker (see [`crate::mqtt::MqttStore`]); the
//! in-memory store backs tests and dry runs.

use crate::error::{PoolsteerError, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Keys held in the persisted store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// Seconds the pump has run today
    Runtime,
    /// JSON array of status entries
    Status,
    /// Time of the last completed cycle
    Heartbeat,
    /// Solar excess seen in the last cycle (W)
    SolarFree,
    /// Manual override flag (`MANUAL` or anything else)
    Override,
}

impl StoreKey {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKey::Runtime => "runtime",
            StoreKey::Status => "status",
            StoreKey::Heartbeat => "heartbeat",
            StoreKey::SolarFree => "solar_free",
            StoreKey::Override => "override",
        }
    }

    /// Full topic under the configured prefix
    pub fn topic(self, prefix: &str) -> String {
        format!("{}/{}", prefix, self.as_str())
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retained key/value store
///
/// `get` returns the last value written by any writer, across restarts of
/// this process. A key that was never written is an error.
#[async_trait::async_trait]
pub trait PersistedStore: Send + Sync {
    async fn put(&self, key: StoreKey, value: String) -> Result<()>;
    async fn get(&self, key: StoreKey) -> Result<String>;
}

#[async_trait::async_trait]
impl<T: PersistedStore + ?Sized> PersistedStore for Arc<T> {
    async fn put(&self, key: StoreKey, value: String) -> Result<()> {
        (**self).put(key, value).await
    }

    async fn get(&self, key: StoreKey) -> Result<String> {
        (**self).get(key).await
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<StoreKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with the given values
    pub fn with_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (StoreKey, V)>,
        V: Into<String>,
    {
        let map = values.into_iter().map(|(k, v)| (k, v.into())).collect();
        Self {
            values: Mutex::new(map),
        }
    }

    /// Current value without going through the async trait
    pub fn value(&self, key: StoreKey) -> Option<String> {
        self.values
            .lock()
            .ok()
            .and_then(|m| m.get(&key).cloned())
    }
}

#[async_trait::async_trait]
impl PersistedStore for MemoryStore {
    async fn put(&self, key: StoreKey, value: String) -> Result<()> {
        let mut map = self
            .values
            .lock()
            .map_err(|_| PoolsteerError::generic("memory store lock poisoned"))?;
        map.insert(key, value);
        Ok(())
    }

    async fn get(&self, key: StoreKey) -> Result<String> {
        self.value(key).ok_or_else(|| {
            PoolsteerError::persisted_state_missing(key.as_str(), "no retained value")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topics() {
        assert_eq!(StoreKey::Runtime.topic("pool"), "pool/runtime");
        assert_eq!(StoreKey::SolarFree.topic("home/pool"), "home/pool/solar_free");
        assert_eq!(StoreKey::Override.to_string(), "override");
    }

    #[tokio::test]
    async fn test_memory_store_put_get() {
        let store = MemoryStore::new();
        assert!(store.get(StoreKey::Runtime).await.is_err());

        store
            .put(StoreKey::Runtime, "300".to_string())
            .await
            .unwrap();
        assert_eq!(store.get(StoreKey::Runtime).await.unwrap(), "300");

        store
            .put(StoreKey::Runtime, "600".to_string())
            .await
            .unwrap();
        assert_eq!(store.value(StoreKey::Runtime).as_deref(), Some("600"));
    }

    #[tokio::test]
    async fn test_missing_key_error_names_key() {
        let store = MemoryStore::with_values([(StoreKey::Runtime, "0")]);
        let err = store.get(StoreKey::Status).await.unwrap_err();
        assert!(matches!(
            err,
            PoolsteerError::PersistedStateMissing { ref key, .. } if key == "status"
        ));
    }
}
