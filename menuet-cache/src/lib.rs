//! Cache client for Menuet applications.
//!
//! Modules reach the cache through the `$cache` capability, a [`Cache`]
//! handle over one of two backends:
//!
//! - [`MemoryCache`]: process-local, used when no URL is configured
//! - [`RedisCache`]: behind the `redis` feature
//!
//! ```
//! use menuet_cache::*;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), CacheError> {
//! let cache = Cache::connect(CacheConfig::memory().with_key_prefix("app")).await?;
//!
//! assert_eq!(cache.incr("visits", 1, Some(Duration::from_secs(60))).await?, 1);
//! assert_eq!(cache.incr("visits", 2, None).await?, 3);
//!
//! cache.set_json("user:1", &serde_json::json!({"name": "Ada"}), None).await?;
//! let user: Option<serde_json::Value> = cache.get_json("user:1", None).await?;
//! assert_eq!(user.unwrap()["name"], "Ada");
//! # Ok(())
//! # }
//! ```

mod cache;
pub mod config;
pub mod error;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_cache;
pub mod traits;

pub use cache::Cache;
pub use config::CacheConfig;
pub use error::{CacheError, CacheResult};
pub use memory::MemoryCache;
#[cfg(feature = "redis")]
pub use redis_cache::RedisCache;
pub use traits::CacheClient;
