//! The `$cache` handle modules receive.

use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::memory::MemoryCache;
use crate::traits::CacheClient;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Shared cache handle: a backend plus the configured key prefix.
///
/// Cloning is cheap; every clone talks to the same backend.
#[derive(Clone)]
pub struct Cache {
    client: Arc<dyn CacheClient>,
    config: CacheConfig,
}

impl Cache {
    pub fn new(client: Arc<dyn CacheClient>, config: CacheConfig) -> Self {
        Self { client, config }
    }

    /// In-process cache without a prefix.
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryCache::new()), CacheConfig::memory())
    }

    /// Build the backend `config` asks for.
    pub async fn connect(config: CacheConfig) -> CacheResult<Self> {
        match config.url.clone() {
            None => {
                info!(backend = "memory", "Cache ready");
                Ok(Self::new(Arc::new(MemoryCache::new()), config))
            }
            Some(url) => Self::connect_redis(&url, config).await,
        }
    }

    #[cfg(feature = "redis")]
    async fn connect_redis(url: &str, config: CacheConfig) -> CacheResult<Self> {
        let client = crate::redis_cache::RedisCache::connect(url).await?;
        info!(backend = "redis", "Cache ready");
        Ok(Self::new(Arc::new(client), config))
    }

    #[cfg(not(feature = "redis"))]
    async fn connect_redis(_url: &str, _config: CacheConfig) -> CacheResult<Self> {
        Err(CacheError::Config(
            "cache.url is set but Redis support is not compiled in (enable the `redis` feature)".to_string(),
        ))
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Read and deserialize a JSON value.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str, ttl: Option<Duration>) -> CacheResult<Option<T>> {
        match self.get(key, ttl).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| CacheError::Deserialization(e.to_string())),
            None => Ok(None),
        }
    }

    /// Serialize and store a value as JSON.
    pub async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T, ttl: Option<Duration>) -> CacheResult<()> {
        let raw = serde_json::to_string(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.set(key, raw, ttl).await
    }
}

#[async_trait]
impl CacheClient for Cache {
    async fn get(&self, key: &str, ttl: Option<Duration>) -> CacheResult<Option<String>> {
        self.client.get(&self.config.build_key(key), ttl).await
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        self.client.set(&self.config.build_key(key), value, ttl).await
    }

    async fn incr(&self, key: &str, by: i64, ttl: Option<Duration>) -> CacheResult<i64> {
        self.client.incr(&self.config.build_key(key), by, ttl).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        self.client.expire(&self.config.build_key(key), ttl).await
    }

    async fn del(&self, key: &str) -> CacheResult<bool> {
        self.client.del(&self.config.build_key(key)).await
    }

    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>> {
        self.client.ttl(&self.config.build_key(key)).await
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache").field("config", &self.config).finish()
    }
}
