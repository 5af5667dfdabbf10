//! qte-store — shared key/value store abstraction used for cooldown
//! fingerprints, allocation caches, and anything else that must survive a
//! daemon restart.
//!
//! The trait is deliberately tiny (string in, string out, optional TTL) so
//! callers serialize their own payloads with `serde_json` and the store
//! stays swappable between the in-memory map used in tests/paper-trading
//! and a Redis-backed implementation for production.

mod memory;
#[cfg(feature = "redis-backend")]
mod redis_store;

pub use memory::InMemoryStore;
#[cfg(feature = "redis-backend")]
pub use redis_store::RedisStore;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[async_trait]
pub trait SharedStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key).await?.is_some())
    }
}

/// JSON-encodes `value` and stores it. A free function (not a trait method)
/// so [`SharedStore`] stays object-safe and usable as `Arc<dyn SharedStore>`.
pub async fn set_json<T: serde::Serialize + Sync>(
    store: &dyn SharedStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let encoded = serde_json::to_string(value)?;
    store.set(key, &encoded).await
}

/// Fetches and JSON-decodes a value previously stored with [`set_json`].
pub async fn get_json<T: serde::de::DeserializeOwned>(
    store: &dyn SharedStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// JSON-encodes `value` and stores it with a TTL.
pub async fn set_json_with_ttl<T: serde::Serialize + Sync>(
    store: &dyn SharedStore,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<(), StoreError> {
    let encoded = serde_json::to_string(value)?;
    store.set_with_ttl(key, &encoded, ttl).await
}
