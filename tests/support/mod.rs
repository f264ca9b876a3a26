#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc};

use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response},
};
use http_body_util::BodyExt;
use taccuino::{
    application::{
        articles::ArticleService,
        catalog::CatalogService,
        refresh::RefreshService,
        render::render_service,
        webhook::{SIGNATURE_HEADER, WebhookSecret, sign},
    },
    cache::{ArticleCache, MemoryCache},
    config::{DEFAULT_WEBHOOK_MAX_BODY_BYTES, SiteSettings},
    domain::articles::FilenamePattern,
    infra::{
        assets::StaticAssets,
        http::{HttpState, build_router},
    },
    presentation::views::LayoutChrome,
};
use tempfile::TempDir;
use tower::ServiceExt;

pub const SECRET: &str = "s3cr3t";

/// A site rooted in a temporary directory with `articles/` and `static/`.
pub struct Site {
    pub dir: TempDir,
    pub cache: Arc<MemoryCache>,
    pub router: Router,
}

impl Site {
    pub async fn new(debug: bool) -> Self {
        Self::with_webhook_limit(debug, DEFAULT_WEBHOOK_MAX_BODY_BYTES).await
    }

    pub async fn with_webhook_limit(debug: bool, webhook_body_limit: usize) -> Self {
        let dir = TempDir::new().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("articles")).expect("articles dir");
        std::fs::create_dir_all(dir.path().join("static/css")).expect("static dir");
        std::fs::write(dir.path().join("static/css/site.css"), "body{}").expect("css");
        std::fs::write(dir.path().join("secret.txt"), "do not serve").expect("secret");

        let articles = dir.path().join("articles");
        std::fs::write(
            articles.join("2024_03_01-spring.md"),
            "# Spring\n\nFlowers *everywhere*.\n",
        )
        .expect("article");
        std::fs::write(
            articles.join("2014_06_17-use_cron.rst"),
            "Use cron\n========\n\nRun it <hourly>.\n",
        )
        .expect("article");
        std::fs::write(articles.join("aboutme.md"), "# About\n\nHi, I write here.\n")
            .expect("about");

        let cache = Arc::new(MemoryCache::new());
        let router = build_site_router(
            dir.path().to_path_buf(),
            cache.clone(),
            debug,
            webhook_body_limit,
        )
        .await;

        Self { dir, cache, router }
    }

    pub fn write_article(&self, name: &str, contents: &str) {
        std::fs::write(self.dir.path().join("articles").join(name), contents)
            .expect("write article");
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Method::GET, uri, None, Vec::new()).await
    }

    pub async fn post_webhook(&self, signature: Option<&str>, body: &[u8]) -> Response<Body> {
        self.send(Method::POST, "/webhooks", signature, body.to_vec())
            .await
    }

    pub async fn post_signed_webhook(&self, body: &[u8]) -> Response<Body> {
        let signature = sign(&WebhookSecret::new(SECRET), body);
        self.post_webhook(Some(&signature), body).await
    }

    /// A correctly signed delivery, for driving the router by hand.
    pub fn signed_webhook_request(&self, body: &[u8]) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/webhooks")
            .header(SIGNATURE_HEADER, sign(&WebhookSecret::new(SECRET), body))
            .body(Body::from(body.to_vec()))
            .expect("request should build")
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        signature: Option<&str>,
        body: Vec<u8>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(signature) = signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }
        let request = builder.body(Body::from(body)).expect("request should build");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond")
    }
}

async fn build_site_router(
    root: PathBuf,
    cache: Arc<MemoryCache>,
    debug: bool,
    webhook_body_limit: usize,
) -> Router {
    let articles_dir = root.join("articles");
    let catalog = Arc::new(
        CatalogService::load(articles_dir.clone(), FilenamePattern::default())
            .await
            .expect("catalog loads"),
    );
    let cache: Arc<dyn ArticleCache> = cache;
    let articles = ArticleService::new(&articles_dir, render_service(), cache.clone())
        .expect("article service")
        .with_cache_bypass(debug);
    let refresh = RefreshService::new(catalog.clone(), cache, None);

    let site = SiteSettings {
        title: "Test Notes".to_string(),
        subtitle: "For tests".to_string(),
        announcement: "Welcome".to_string(),
        github_url: None,
        author: "tester".to_string(),
    };

    build_router(HttpState {
        catalog,
        articles: Arc::new(articles),
        refresh: Arc::new(refresh),
        secret: Arc::new(WebhookSecret::new(SECRET)),
        chrome: Arc::new(LayoutChrome::from_site(&site)),
        about_file: Arc::from("aboutme.md"),
        assets: Arc::new(StaticAssets::new(&root.join("static"))),
        webhook_body_limit,
        debug,
    })
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}
