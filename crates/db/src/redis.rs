//! Redis connection pool.

use std::time::Duration;

use bb8::Pool;
use bb8_redis::RedisConnectionManager;

pub type RedisPool = Pool<RedisConnectionManager>;

#[derive(Debug, thiserror::Error)]
pub enum RedisPoolError {
    #[error("invalid redis url: {0}")]
    InvalidUrl(#[from] bb8_redis::redis::RedisError),
}

/// Build a bb8 pool for `url`.
///
/// Connections are established lazily, so an unreachable server surfaces on
/// the first checkout rather than here.
pub fn create_redis_pool(url: &str, max_size: u32) -> Result<RedisPool, RedisPoolError> {
    let manager = RedisConnectionManager::new(url)?;
    let pool = Pool::builder()
        .max_size(max_size)
        .connection_timeout(Duration::from_secs(5))
        .build_unchecked(manager);

    tracing::info!(max_size, "Redis connection pool created");
    Ok(pool)
}
