//! Cache client trait.

use crate::error::CacheResult;
use async_trait::async_trait;
use std::time::Duration;

/// Key/value store behind the `$cache` capability.
///
/// Every `ttl` argument is optional; when given, the key's time to live is
/// (re)set after the operation.
#[async_trait]
pub trait CacheClient: Send + Sync {
    /// Read a value. With `ttl`, also refreshes the key's expiry.
    async fn get(&self, key: &str, ttl: Option<Duration>) -> CacheResult<Option<String>>;

    /// Store a value.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()>;

    /// Add `by` to an integer value, creating it at zero, and return the
    /// value after the increment.
    async fn incr(&self, key: &str, by: i64, ttl: Option<Duration>) -> CacheResult<i64>;

    /// Set a key's time to live. Returns false when the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool>;

    /// Remove a key. Returns whether it existed.
    async fn del(&self, key: &str) -> CacheResult<bool>;

    /// Remaining time to live; `None` for missing keys and keys without expiry.
    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>>;

    /// Read a value and parse it as a number.
    async fn get_number(&self, key: &str, ttl: Option<Duration>) -> CacheResult<Option<f64>> {
        match self.get(key, ttl).await? {
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| crate::CacheError::NotANumber(key.to_string())),
            None => Ok(None),
        }
    }
}
