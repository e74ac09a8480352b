//! Cache configuration types.

use crate::error::{CacheError, CacheResult};

/// Where cache entries live and how keys are namespaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// Redis connection URL; `None` selects the in-process store.
    pub url: Option<String>,

    /// Key prefix for all cache keys
    pub key_prefix: Option<String>,
}

impl CacheConfig {
    /// In-process store, no prefix.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Redis store at `url` (e.g. `redis://localhost:6379`).
    ///
    /// ```
    /// use menuet_cache::CacheConfig;
    ///
    /// let config = CacheConfig::redis("redis://localhost:6379").unwrap();
    /// assert_eq!(config.url.as_deref(), Some("redis://localhost:6379"));
    /// assert!(CacheConfig::redis("localhost:6379").is_err());
    /// ```
    pub fn redis(url: impl Into<String>) -> CacheResult<Self> {
        let url = url.into();
        if !(url.starts_with("redis://") || url.starts_with("rediss://")) {
            return Err(CacheError::InvalidUrl(url));
        }
        Ok(Self {
            url: Some(url),
            key_prefix: None,
        })
    }

    /// Set key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.key_prefix = if prefix.is_empty() { None } else { Some(prefix) };
        self
    }

    /// Build a full key with prefix.
    pub fn build_key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }
}
