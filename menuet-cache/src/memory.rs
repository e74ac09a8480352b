//! In-process cache store.

use crate::error::{CacheError, CacheResult};
use crate::traits::CacheClient;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Process-local store used when no Redis URL is configured.
///
/// Expired entries are dropped lazily on access, or all at once with
/// [`MemoryCache::purge_expired`].
#[derive(Debug, Default)]
pub struct MemoryCache {
    data: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut data = self.data.write();
        let before = data.len();
        data.retain(|_, entry| entry.is_live(now));
        before - data.len()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    fn live_entry<'a>(data: &'a mut HashMap<String, Entry>, key: &str, now: Instant) -> Option<&'a mut Entry> {
        if data.get(key).is_some_and(|entry| !entry.is_live(now)) {
            data.remove(key);
        }
        data.get_mut(key)
    }
}

#[async_trait]
impl CacheClient for MemoryCache {
    async fn get(&self, key: &str, ttl: Option<Duration>) -> CacheResult<Option<String>> {
        let now = Instant::now();
        let mut data = self.data.write();
        let Some(entry) = Self::live_entry(&mut data, key, now) else {
            return Ok(None);
        };
        if let Some(ttl) = ttl {
            entry.expires_at = Some(now + ttl);
        }
        Ok(Some(entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.data.write().insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn incr(&self, key: &str, by: i64, ttl: Option<Duration>) -> CacheResult<i64> {
        let now = Instant::now();
        let mut data = self.data.write();

        let (current, expires_at) = match Self::live_entry(&mut data, key, now) {
            Some(entry) => {
                let current = entry
                    .value
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| CacheError::NotANumber(key.to_string()))?;
                (current, entry.expires_at)
            }
            None => (0, None),
        };

        let next = current
            .checked_add(by)
            .ok_or_else(|| CacheError::NotANumber(key.to_string()))?;
        let expires_at = ttl.map(|ttl| now + ttl).or(expires_at);
        data.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let now = Instant::now();
        let mut data = self.data.write();
        match Self::live_entry(&mut data, key, now) {
            Some(entry) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn del(&self, key: &str) -> CacheResult<bool> {
        let now = Instant::now();
        Ok(self
            .data
            .write()
            .remove(key)
            .is_some_and(|entry| entry.is_live(now)))
    }

    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>> {
        let now = Instant::now();
        let data = self.data.read();
        Ok(data
            .get(key)
            .filter(|entry| entry.is_live(now))
            .and_then(|entry| entry.expires_at)
            .map(|at| at - now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MemoryCache::new();
        cache.set("greeting", "hello".to_string(), None).await.unwrap();

        assert_eq!(cache.get("greeting", None).await.unwrap().as_deref(), Some("hello"));
        assert_eq!(cache.get("missing", None).await.unwrap(), None);
        assert_eq!(cache.ttl("greeting").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let cache = MemoryCache::new();
        cache
            .set("session", "abc".to_string(), Some(Duration::from_secs(10)))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.ttl("session").await.unwrap(), Some(Duration::from_secs(5)));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(cache.get("session", None).await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_refreshes_ttl() {
        let cache = MemoryCache::new();
        cache
            .set("session", "abc".to_string(), Some(Duration::from_secs(10)))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(8)).await;
        cache.get("session", Some(Duration::from_secs(10))).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(cache.get("session", None).await.unwrap().as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_incr_returns_new_value() {
        let cache = MemoryCache::new();
        assert_eq!(cache.incr("visits", 1, None).await.unwrap(), 1);
        assert_eq!(cache.incr("visits", 5, None).await.unwrap(), 6);
        assert_eq!(cache.incr("visits", -2, Some(Duration::from_secs(60))).await.unwrap(), 4);
        assert!(cache.ttl("visits").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_incr_on_text_fails() {
        let cache = MemoryCache::new();
        cache.set("name", "menuet".to_string(), None).await.unwrap();
        assert!(matches!(
            cache.incr("name", 1, None).await,
            Err(CacheError::NotANumber(_))
        ));
    }

    #[tokio::test]
    async fn test_expire_and_del() {
        let cache = MemoryCache::new();
        assert!(!cache.expire("missing", Duration::from_secs(1)).await.unwrap());

        cache.set("key", "1".to_string(), None).await.unwrap();
        assert!(cache.expire("key", Duration::from_secs(30)).await.unwrap());
        assert!(cache.del("key").await.unwrap());
        assert!(!cache.del("key").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = MemoryCache::new();
        cache.set("a", "1".to_string(), Some(Duration::from_secs(1))).await.unwrap();
        cache.set("b", "2".to_string(), None).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_get_number() {
        let cache = MemoryCache::new();
        cache.set("price", "12.5".to_string(), None).await.unwrap();
        assert_eq!(cache.get_number("price", None).await.unwrap(), Some(12.5));
        assert_eq!(cache.get_number("missing", None).await.unwrap(), None);
    }
}
