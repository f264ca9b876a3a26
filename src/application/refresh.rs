//! Content refresh triggered by a verified webhook.

use std::sync::Arc;

use metrics::counter;
use tracing::{info, warn};

use crate::{
    application::{
        catalog::{CatalogError, CatalogService},
        sync::RepositorySync,
    },
    cache::ArticleCache,
};

const SOURCE: &str = "taccuino::refresh";

/// Result of a successful refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub articles: usize,
    pub sync_started: bool,
}

pub struct RefreshService {
    catalog: Arc<CatalogService>,
    cache: Arc<dyn ArticleCache>,
    sync: Option<RepositorySync>,
}

impl RefreshService {
    pub fn new(
        catalog: Arc<CatalogService>,
        cache: Arc<dyn ArticleCache>,
        sync: Option<RepositorySync>,
    ) -> Self {
        Self {
            catalog,
            cache,
            sync,
        }
    }

    /// Start a repository pull, rebuild the catalog, and clear the article
    /// cache.
    ///
    /// The cache is cleared even when the rebuild fails, in which case the
    /// previous catalog stays published and the error is returned.
    pub async fn refresh(&self) -> Result<RefreshOutcome, CatalogError> {
        let sync_started = match &self.sync {
            Some(sync) => {
                drop(sync.spawn());
                true
            }
            None => false,
        };

        let rebuilt = self.catalog.rebuild().await;

        self.cache.clear_all().await;
        counter!("taccuino_article_cache_clear_total").increment(1);

        match rebuilt {
            Ok(catalog) => {
                info!(
                    target = SOURCE,
                    articles = catalog.len(),
                    sync_started,
                    backend = %self.cache.backend(),
                    "Content refreshed"
                );
                Ok(RefreshOutcome {
                    articles: catalog.len(),
                    sync_started,
                })
            }
            Err(err) => {
                warn!(
                    target = SOURCE,
                    error = %err,
                    "Catalog rebuild failed; keeping previous catalog"
                );
                Err(err)
            }
        }
    }
}
