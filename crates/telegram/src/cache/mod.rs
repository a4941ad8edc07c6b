//! Key/value cache seam.
//!
//! Everything cached here is advisory: callers fall back to the upstream on
//! a miss or a cache failure. [`RedisCache`] is the production backend and
//! [`MemoryCache`] serves single-process deployments and tests.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod memory;
pub mod redis;

pub use memory::MemoryCache;
pub use self::redis::RedisCache;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache connection unavailable: {0}")]
    Pool(String),

    #[error("cache command failed: {0}")]
    Command(#[from] bb8_redis::redis::RedisError),

    #[error("cached value could not be (de)serialized: {0}")]
    Serde(#[from] serde_json::Error),
}

#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Store `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Fetch a value; a missing or expired key is `None`.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError>;

    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Increment the counter at `key`, starting its `window` on the first
    /// hit. Returns the count after incrementing.
    async fn increment_rate_limit(&self, key: &str, window: Duration) -> Result<u64, CacheError>;

    /// All keys matching a glob `pattern`, walked `batch` keys at a time.
    async fn scan_keys(&self, pattern: &str, batch: usize) -> Result<Vec<String>, CacheError>;

    /// Round-trip to the backend.
    async fn ping(&self) -> Result<(), CacheError>;
}

/// JSON helpers over any [`KeyValueCache`].
#[async_trait]
pub trait CacheJsonExt: KeyValueCache {
    async fn set_json<T>(&self, key: &str, value: &T, ttl: Duration) -> Result<(), CacheError>
    where
        T: Serialize + Sync,
    {
        let encoded = serde_json::to_string(value)?;
        self.set(key, &encoded, ttl).await
    }

    async fn get_json<T>(&self, key: &str) -> Result<Option<T>, CacheError>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

impl<C: KeyValueCache + ?Sized> CacheJsonExt for C {}
