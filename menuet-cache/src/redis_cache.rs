//! Redis cache store.

use crate::error::{CacheError, CacheResult};
use crate::traits::CacheClient;
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::time::Duration;
use tracing::debug;

/// Redis-backed store sharing one multiplexed connection.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    /// Connect to the server at `url`.
    ///
    /// ```no_run
    /// use menuet_cache::*;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), CacheError> {
    ///     let cache = RedisCache::connect("redis://localhost:6379").await?;
    ///     cache.set("greeting", "hello".to_string(), None).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = Client::open(url).map_err(|e| CacheError::Connection(e.to_string()))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        debug!("Redis connection ready");
        Ok(Self { connection })
    }

    /// Get the underlying connection manager.
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    async fn apply_ttl(&self, key: &str, ttl: Option<Duration>) -> CacheResult<()> {
        if let Some(ttl) = ttl {
            let mut conn = self.connection.clone();
            let _: bool = conn.expire(key, ttl_seconds(ttl)).await?;
        }
        Ok(())
    }
}

fn ttl_seconds(ttl: Duration) -> i64 {
    ttl.as_secs().max(1) as i64
}

#[async_trait]
impl CacheClient for RedisCache {
    async fn get(&self, key: &str, ttl: Option<Duration>) -> CacheResult<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        if value.is_some() {
            self.apply_ttl(key, ttl).await?;
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        let mut conn = self.connection.clone();

        if let Some(ttl) = ttl {
            let _: () = conn.set_ex(key, value, ttl_seconds(ttl) as u64).await?;
        } else {
            let _: () = conn.set(key, value).await?;
        }

        Ok(())
    }

    async fn incr(&self, key: &str, by: i64, ttl: Option<Duration>) -> CacheResult<i64> {
        let mut conn = self.connection.clone();
        let next: i64 = conn.incr(key, by).await?;
        self.apply_ttl(key, ttl).await?;
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let mut conn = self.connection.clone();
        let updated: bool = conn.expire(key, ttl_seconds(ttl)).await?;
        Ok(updated)
    }

    async fn del(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.connection.clone();
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>> {
        let mut conn = self.connection.clone();

        let seconds: i64 = conn.ttl(key).await?;

        // -2: no such key, -1: no expiry
        match seconds {
            seconds if seconds > 0 => Ok(Some(Duration::from_secs(seconds as u64))),
            _ => Ok(None),
        }
    }
}
