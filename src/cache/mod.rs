//! Rendered-article cache.
//!
//! Article bodies are cached by filename with a cache-aside discipline: the
//! caller checks the cache, renders on a miss, then populates it. Entries are
//! never evicted individually; every content refresh clears the whole cache.
//!
//! Two interchangeable backends implement [`ArticleCache`]:
//!
//! - [`MemoryCache`]: an in-process map, always available
//! - [`RedisCache`]: a Redis hash shared across restarts
//!
//! The backend is chosen once at startup by [`connect_cache`]. When Redis is
//! requested but unreachable the server degrades to the in-process map.

mod config;
mod memory;
mod remote;

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use tracing::{info, warn};

pub use config::CacheConfig;
pub use memory::MemoryCache;
pub use remote::{CacheError, RedisCache};

const SOURCE: &str = "taccuino::cache";

/// Which implementation is serving the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
    Redis,
}

impl CacheBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Redis => "redis",
        }
    }
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filename → rendered HTML body store.
///
/// Backend failures are absorbed: a failing `get` reads as a miss and a
/// failing `set` or `clear_all` is logged and dropped.
#[async_trait]
pub trait ArticleCache: Send + Sync {
    async fn get(&self, filename: &str) -> Option<String>;

    async fn set(&self, filename: &str, body: &str);

    /// Drop every cached body.
    async fn clear_all(&self);

    fn backend(&self) -> CacheBackend;
}

/// Select the cache backend for this process.
pub async fn connect_cache(config: &CacheConfig) -> Arc<dyn ArticleCache> {
    if !config.enabled {
        info!(
            target = SOURCE,
            backend = %CacheBackend::Memory,
            "External cache disabled; using in-process cache"
        );
        return Arc::new(MemoryCache::new());
    }

    match RedisCache::connect(config).await {
        Ok(cache) => {
            info!(
                target = SOURCE,
                backend = %CacheBackend::Redis,
                hash_key = %config.hash_key,
                "Connected to external cache"
            );
            Arc::new(cache)
        }
        Err(err) => {
            warn!(
                target = SOURCE,
                backend = %CacheBackend::Memory,
                error = %err,
                "External cache unavailable; falling back to in-process cache"
            );
            Arc::new(MemoryCache::new())
        }
    }
}
