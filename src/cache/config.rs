//! Cache configuration.

use std::time::Duration;

use crate::config::{
    CacheSettings, DEFAULT_CACHE_CONNECT_TIMEOUT_MS, DEFAULT_CACHE_HASH_KEY, DEFAULT_REDIS_URL,
};

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Prefer the Redis backend; the in-process map is used otherwise.
    pub enabled: bool,
    pub redis_url: String,
    /// Redis hash holding every cached article body.
    pub hash_key: String,
    pub connect_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            hash_key: DEFAULT_CACHE_HASH_KEY.to_string(),
            connect_timeout: Duration::from_millis(DEFAULT_CACHE_CONNECT_TIMEOUT_MS),
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            redis_url: settings.redis_url.clone(),
            hash_key: settings.hash_key.clone(),
            connect_timeout: settings.connect_timeout,
        }
    }
}
