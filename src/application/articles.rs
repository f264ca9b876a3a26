//! Article page rendering with a cache-aside read path.

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use metrics::counter;
use thiserror::Error;
use tokio::fs;
use tracing::debug;

use crate::{
    application::render::{RenderError, RenderRequest, RenderService},
    cache::ArticleCache,
    util::paths::relative_within,
};

const SOURCE: &str = "taccuino::articles";

#[derive(Debug, Error)]
pub enum ArticleError {
    #[error("article `{0}` not found")]
    NotFound(String),
    #[error("failed to read article `{filename}`")]
    Io {
        filename: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Renders articles from one directory, consulting the article cache first.
pub struct ArticleService {
    root: PathBuf,
    renderer: Arc<dyn RenderService>,
    cache: Arc<dyn ArticleCache>,
    bypass_cache: bool,
}

impl ArticleService {
    /// `root` must exist; it is canonicalised once so symlink escapes can be
    /// detected per request.
    pub fn new(
        root: &Path,
        renderer: Arc<dyn RenderService>,
        cache: Arc<dyn ArticleCache>,
    ) -> io::Result<Self> {
        Ok(Self {
            root: root.canonicalize()?,
            renderer,
            cache,
            bypass_cache: false,
        })
    }

    /// Skip the cache entirely; every request re-reads and re-renders.
    pub fn with_cache_bypass(mut self, bypass: bool) -> Self {
        self.bypass_cache = bypass;
        self
    }

    pub fn cache(&self) -> &Arc<dyn ArticleCache> {
        &self.cache
    }

    /// Rendered HTML body for `filename`.
    pub async fn render(&self, filename: &str) -> Result<String, ArticleError> {
        let path = self.resolve(filename).await?;

        if !self.bypass_cache {
            if let Some(body) = self.cache.get(filename).await {
                counter!("taccuino_article_cache_hit_total").increment(1);
                return Ok(body);
            }
            counter!("taccuino_article_cache_miss_total").increment(1);
        }

        let bytes = fs::read(&path).await.map_err(|source| ArticleError::Io {
            filename: filename.to_string(),
            source,
        })?;
        let request = RenderRequest::from_bytes(filename, bytes)?;
        let output = self.renderer.render(&request)?;

        debug!(
            target = SOURCE,
            filename,
            markup = request.markup.as_str(),
            bytes = output.html.len(),
            "Article rendered"
        );

        if !self.bypass_cache {
            self.cache.set(filename, &output.html).await;
        }

        Ok(output.html)
    }

    /// Map a request filename to a regular file under the article root.
    async fn resolve(&self, filename: &str) -> Result<PathBuf, ArticleError> {
        let not_found = || ArticleError::NotFound(filename.to_string());

        let relative = relative_within(filename).ok_or_else(not_found)?;
        let candidate = fs::canonicalize(self.root.join(relative))
            .await
            .map_err(|_| not_found())?;

        if !candidate.starts_with(&self.root) {
            return Err(not_found());
        }

        let metadata = fs::metadata(&candidate).await.map_err(|_| not_found())?;
        if !metadata.is_file() {
            return Err(not_found());
        }

        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tempfile::TempDir;

    use super::*;
    use crate::{
        application::render::{RenderOutput, render_service},
        cache::MemoryCache,
    };

    #[derive(Default)]
    struct CountingRenderer {
        calls: AtomicUsize,
    }

    impl RenderService for CountingRenderer {
        fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RenderOutput {
                html: format!("<p>{}</p>", request.source.trim()),
            })
        }
    }

    struct Fixture {
        dir: TempDir,
        renderer: Arc<CountingRenderer>,
        cache: Arc<MemoryCache>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().expect("tempdir");
            std::fs::create_dir(dir.path().join("articles")).expect("mkdir");
            Self {
                dir,
                renderer: Arc::new(CountingRenderer::default()),
                cache: Arc::new(MemoryCache::new()),
            }
        }

        fn articles(&self) -> PathBuf {
            self.dir.path().join("articles")
        }

        fn write(&self, name: &str, contents: &str) {
            std::fs::write(self.articles().join(name), contents).expect("write fixture");
        }

        fn service(&self) -> ArticleService {
            ArticleService::new(
                &self.articles(),
                self.renderer.clone(),
                self.cache.clone(),
            )
            .expect("service")
        }

        fn calls(&self) -> usize {
            self.renderer.calls.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn second_request_is_served_from_cache() {
        let fixture = Fixture::new();
        fixture.write("2024_01_01-a.md", "first");
        let service = fixture.service();

        assert_eq!(service.render("2024_01_01-a.md").await.unwrap(), "<p>first</p>");
        fixture.write("2024_01_01-a.md", "second");
        assert_eq!(service.render("2024_01_01-a.md").await.unwrap(), "<p>first</p>");
        assert_eq!(fixture.calls(), 1);

        service.cache().clear_all().await;
        assert_eq!(service.render("2024_01_01-a.md").await.unwrap(), "<p>second</p>");
        assert_eq!(fixture.calls(), 2);
    }

    #[tokio::test]
    async fn bypass_renders_every_time() {
        let fixture = Fixture::new();
        fixture.write("2024_01_01-a.md", "body");
        let service = fixture.service().with_cache_bypass(true);

        service.render("2024_01_01-a.md").await.unwrap();
        service.render("2024_01_01-a.md").await.unwrap();

        assert_eq!(fixture.calls(), 2);
        assert!(fixture.cache.is_empty().await);
    }

    #[tokio::test]
    async fn missing_file_is_not_found_and_not_cached() {
        let fixture = Fixture::new();
        let service = fixture.service();

        let err = service.render("does-not-exist").await.unwrap_err();
        assert!(matches!(err, ArticleError::NotFound(name) if name == "does-not-exist"));
        assert!(fixture.cache.is_empty().await);
    }

    #[tokio::test]
    async fn traversal_outside_root_is_not_found() {
        let fixture = Fixture::new();
        std::fs::write(fixture.dir.path().join("secret.txt"), "hunter2").expect("write");
        let service = fixture.service();

        for attempt in ["../secret.txt", "/etc/passwd", "../../etc/passwd", ""] {
            let err = service.render(attempt).await.unwrap_err();
            assert!(matches!(err, ArticleError::NotFound(_)), "{attempt}");
        }
        assert_eq!(fixture.calls(), 0);
    }

    #[tokio::test]
    async fn directories_are_not_articles() {
        let fixture = Fixture::new();
        std::fs::create_dir(fixture.articles().join("img")).expect("mkdir");
        let service = fixture.service();

        assert!(matches!(
            service.render("img").await,
            Err(ArticleError::NotFound(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_escaping_root_is_not_found() {
        let fixture = Fixture::new();
        std::fs::write(fixture.dir.path().join("secret.txt"), "hunter2").expect("write");
        std::os::unix::fs::symlink(
            fixture.dir.path().join("secret.txt"),
            fixture.articles().join("2024_01_01-leak.md"),
        )
        .expect("symlink");
        let service = fixture.service();

        assert!(matches!(
            service.render("2024_01_01-leak.md").await,
            Err(ArticleError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn non_utf8_content_is_a_render_error() {
        let fixture = Fixture::new();
        std::fs::write(fixture.articles().join("2024_01_01-bin.txt"), [0xff, 0xfe, 0x00])
            .expect("write");
        let service = fixture.service();

        assert!(matches!(
            service.render("2024_01_01-bin.txt").await,
            Err(ArticleError::Render(RenderError::Encoding { .. }))
        ));
    }

    #[tokio::test]
    async fn default_renderer_produces_markdown_html() {
        let fixture = Fixture::new();
        fixture.write("2024_01_01-a.md", "# Hello\n\nWorld\n");
        let service = ArticleService::new(
            &fixture.articles(),
            render_service(),
            fixture.cache.clone(),
        )
        .expect("service");

        let html = service.render("2024_01_01-a.md").await.unwrap();
        assert!(html.contains("<h1>Hello</h1>"), "{html}");
        assert!(html.contains("<p>World</p>"), "{html}");
    }
}
