//! In-process store. Expired keys are dropped on read and on every write.

use super::KeyValueStore;
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Expiry used when `now + ttl` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Store kept in memory for the life of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    writes: Mutex<u64>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .map(|entries| entries.values().filter(|e| e.expires_at > now).count())
            .unwrap_or(0)
    }

    /// Returns true if no live keys are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total successful `set` calls.
    pub fn writes(&self) -> u64 {
        self.writes.lock().map(|w| *w).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>, StoreError> {
        self.entries.lock().map_err(|_| StoreError::Command("memory store poisoned".to_string()))
    }

    fn live_value(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.live_value(key)?.is_some())
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .ok_or_else(|| StoreError::Command(format!("ttl {:?} out of range", ttl)))?;

        let mut entries = self.lock()?;
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(key.to_string(), Entry { value: value.to_string(), expires_at });
        drop(entries);

        if let Ok(mut writes) = self.writes.lock() {
            *writes += 1;
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.live_value(key)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_exists() {
        let store = MemoryStore::new();
        assert!(!store.exists("a").await.unwrap());

        store.set("a", "1", Duration::from_secs(60)).await.unwrap();
        assert!(store.exists("a").await.unwrap());
        assert_eq!(store.get("a").await.unwrap(), Some("1".to_string()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new();
        store.set("a", "1", Duration::from_secs(60)).await.unwrap();
        store.delete("a").await.unwrap();
        store.delete("missing").await.unwrap();
        assert!(!store.exists("a").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_expired_entries_vanish() {
        let store = MemoryStore::new();
        store.set("a", "1", Duration::ZERO).await.unwrap();
        assert!(!store.exists("a").await.unwrap());
        assert_eq!(store.get("a").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_set_prunes_expired_keys() {
        let store = MemoryStore::new();
        store.set("stale-1", "1", Duration::ZERO).await.unwrap();
        store.set("stale-2", "2", Duration::ZERO).await.unwrap();

        store.set("fresh", "3", Duration::from_secs(60)).await.unwrap();

        let held: Vec<String> = store.entries.lock().unwrap().keys().cloned().collect();
        assert_eq!(held, vec!["fresh".to_string()]);
    }

    #[tokio::test]
    async fn test_huge_ttl_does_not_overflow() {
        let store = MemoryStore::new();
        store.set("a", "1", Duration::MAX).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some("1".to_string()));
        assert_eq!(store.writes(), 1);
    }
}
