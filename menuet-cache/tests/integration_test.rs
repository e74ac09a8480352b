//! Integration tests for menuet-cache

use menuet_cache::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    visits: u32,
}

#[tokio::test]
async fn test_prefix_is_applied_to_backend_keys() {
    let backend = Arc::new(MemoryCache::new());
    let cache = Cache::new(backend.clone(), CacheConfig::memory().with_key_prefix("menuet"));

    cache.set("greeting", "hello".to_string(), None).await.unwrap();

    assert_eq!(
        backend.get("menuet:greeting", None).await.unwrap().as_deref(),
        Some("hello")
    );
    assert_eq!(backend.get("greeting", None).await.unwrap(), None);
    assert!(cache.del("greeting").await.unwrap());
}

#[tokio::test]
async fn test_json_values() {
    let cache = Cache::memory();
    let profile = Profile {
        name: "Ada".to_string(),
        visits: 3,
    };

    cache.set_json("profile:1", &profile, None).await.unwrap();
    let loaded: Option<Profile> = cache.get_json("profile:1", None).await.unwrap();
    assert_eq!(loaded, Some(profile));

    cache.set("profile:2", "not json".to_string(), None).await.unwrap();
    let broken = cache.get_json::<Profile>("profile:2", None).await;
    assert!(matches!(broken, Err(CacheError::Deserialization(_))));
}

#[tokio::test(start_paused = true)]
async fn test_incr_with_ttl_counts_within_window() {
    let cache = Cache::memory();
    let window = Some(Duration::from_secs(60));

    assert_eq!(cache.incr("rate:10.0.0.1", 1, window).await.unwrap(), 1);
    assert_eq!(cache.incr("rate:10.0.0.1", 1, window).await.unwrap(), 2);

    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(cache.incr("rate:10.0.0.1", 1, window).await.unwrap(), 1);
}

#[tokio::test]
async fn test_connect_memory_backend() {
    let cache = Cache::connect(CacheConfig::memory()).await.unwrap();
    assert!(cache.config().url.is_none());
    assert_eq!(cache.ttl("missing").await.unwrap(), None);
}

#[cfg(not(feature = "redis"))]
#[tokio::test]
async fn test_redis_url_without_feature() {
    let config = CacheConfig::redis("redis://localhost:6379").unwrap();
    assert!(matches!(Cache::connect(config).await, Err(CacheError::Config(_))));
}

#[tokio::test]
async fn test_trait_object_usage() {
    let client: Arc<dyn CacheClient> = Arc::new(Cache::memory());
    client.set("n", "41".to_string(), None).await.unwrap();
    assert_eq!(client.incr("n", 1, None).await.unwrap(), 42);
    assert_eq!(client.get_number("n", None).await.unwrap(), Some(42.0));
}
