//! [`KeyValueCache`] on a bb8 Redis pool.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::redis::{self, AsyncCommands};
use tgw_db::redis::RedisPool;

use super::{CacheError, KeyValueCache};

#[derive(Clone)]
pub struct RedisCache {
    pool: RedisPool,
}

impl RedisCache {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    async fn conn(
        &self,
    ) -> Result<bb8::PooledConnection<'_, bb8_redis::RedisConnectionManager>, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Pool(e.to_string()))
    }
}

#[async_trait]
impl KeyValueCache for RedisCache {
    #[tracing::instrument(level = "debug", name = "redis_set", skip(self, value))]
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    #[tracing::instrument(level = "debug", name = "redis_delete", skip_all, fields(count = keys.len()))]
    async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(keys.to_vec()).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn().await?;
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn increment_rate_limit(&self, key: &str, window: Duration) -> Result<u64, CacheError> {
        let mut conn = self.conn().await?;
        let count: u64 = conn.incr(key, 1u64).await?;
        if count == 1 {
            conn.expire::<_, ()>(key, window.as_secs().max(1) as i64)
                .await?;
        }
        Ok(count)
    }

    #[tracing::instrument(level = "debug", name = "redis_scan", skip(self))]
    async fn scan_keys(&self, pattern: &str, batch: usize) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn().await?;
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, page): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(batch.max(1))
                .query_async(&mut *conn)
                .await?;
            keys.extend(page);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(keys)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut *conn)
            .await?;
        Ok(())
    }
}
