use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ArticleCache, CacheBackend};

/// In-process article cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ArticleCache for MemoryCache {
    async fn get(&self, filename: &str) -> Option<String> {
        self.entries.read().await.get(filename).cloned()
    }

    async fn set(&self, filename: &str, body: &str) {
        self.entries
            .write()
            .await
            .insert(filename.to_string(), body.to_string());
    }

    async fn clear_all(&self) {
        self.entries.write().await.clear();
    }

    fn backend(&self) -> CacheBackend {
        CacheBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = MemoryCache::new();
        cache.set("x.rst", "<p>hi</p>").await;

        assert_eq!(cache.get("x.rst").await.as_deref(), Some("<p>hi</p>"));
        assert_eq!(cache.get("y.rst").await, None);
    }

    #[tokio::test]
    async fn clear_all_drops_every_entry() {
        let cache = MemoryCache::new();
        cache.set("x.rst", "<p>hi</p>").await;
        cache.set("y.md", "<p>yo</p>").await;
        assert_eq!(cache.len().await, 2);

        cache.clear_all().await;

        assert_eq!(cache.get("x.rst").await, None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn set_overwrites_previous_body() {
        let cache = MemoryCache::new();
        cache.set("x.rst", "old").await;
        cache.set("x.rst", "new").await;

        assert_eq!(cache.get("x.rst").await.as_deref(), Some("new"));
    }
}
