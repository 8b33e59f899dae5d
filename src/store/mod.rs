//! Key-value store capability used for listing deduplication.

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

use crate::error::StoreError;
use async_trait::async_trait;
use std::time::Duration;

pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;

/// String key-value store with per-key expiry.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns true if `key` is present and not expired.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Writes `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Reads the value under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
