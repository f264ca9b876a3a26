use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    middleware,
    response::Response,
    routing::get,
};

use crate::{
    application::{
        articles::{ArticleError, ArticleService},
        catalog::CatalogService,
        error::ErrorReport,
        refresh::RefreshService,
        webhook::WebhookSecret,
    },
    infra::assets::StaticAssets,
    presentation::views::{
        ArticleTemplate, ArticleView, IndexTemplate, IndexView, LayoutChrome, LayoutContext,
        render_internal_error_response, render_not_found_response, render_template_response,
    },
};

use super::{
    middleware::{log_responses, no_store, set_request_context},
    webhooks,
};

const ARTICLE_SUFFIX: &str = ".html";

#[derive(Clone)]
pub struct HttpState {
    pub catalog: Arc<CatalogService>,
    pub articles: Arc<ArticleService>,
    pub refresh: Arc<RefreshService>,
    pub secret: Arc<WebhookSecret>,
    pub chrome: Arc<LayoutChrome>,
    /// About page source, relative to the article directory.
    pub about_file: Arc<str>,
    pub assets: Arc<StaticAssets>,
    /// Request body cap for webhook deliveries, in bytes.
    pub webhook_body_limit: usize,
    pub debug: bool,
}

impl HttpState {
    fn chrome(&self) -> LayoutChrome {
        self.chrome.as_ref().clone()
    }
}

pub fn build_router(state: HttpState) -> Router {
    let debug = state.debug;
    let webhook_body_limit = state.webhook_body_limit;

    let router = Router::new()
        .route("/", get(index))
        .route("/aboutme.html", get(about))
        .route("/aboutme.html/", get(about))
        .route("/article/{*path}", get(article))
        .route(
            "/webhooks",
            get(webhooks::ping)
                .post(webhooks::refresh)
                .layer(DefaultBodyLimit::max(webhook_body_limit)),
        )
        .route(
            "/webhooks/",
            get(webhooks::ping)
                .post(webhooks::refresh)
                .layer(DefaultBodyLimit::max(webhook_body_limit)),
        )
        .route("/static/{*path}", get(static_asset))
        .fallback(fallback)
        .with_state(state);

    let router = if debug {
        router.layer(middleware::from_fn(no_store))
    } else {
        router
    };

    router
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn index(State(state): State<HttpState>) -> Response {
    let catalog = state.catalog.current();
    let view = LayoutContext::new(state.chrome(), IndexView::from_catalog(&catalog));
    render_template_response(IndexTemplate { view }, StatusCode::OK)
}

async fn article(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    let Some(filename) = article_filename(&path) else {
        return render_not_found_response(state.chrome());
    };

    let catalog = state.catalog.current();
    let entry = catalog.find(filename);
    let title = entry
        .map(|entry| entry.title.clone())
        .unwrap_or_else(|| filename.to_string());
    let date = entry.map(|entry| entry.date.clone());

    render_article(&state, filename, title, date).await
}

async fn about(State(state): State<HttpState>) -> Response {
    let filename = state.about_file.clone();
    render_article(&state, &filename, filename.to_string(), None).await
}

async fn render_article(
    state: &HttpState,
    filename: &str,
    title: String,
    date: Option<String>,
) -> Response {
    const SOURCE: &str = "infra::http::public::render_article";

    match state.articles.render(filename).await {
        Ok(body_html) => {
            let content = ArticleView {
                title,
                date,
                body_html,
            };
            let view = LayoutContext::new(state.chrome(), content);
            render_template_response(ArticleTemplate { view }, StatusCode::OK)
        }
        Err(ArticleError::NotFound(_)) => render_not_found_response(state.chrome()),
        Err(err) => render_internal_error_response(
            state.chrome(),
            ErrorReport::from_error(SOURCE, StatusCode::INTERNAL_SERVER_ERROR, &err),
        ),
    }
}

async fn static_asset(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    state.assets.serve(&path).await
}

async fn fallback(State(state): State<HttpState>) -> Response {
    render_not_found_response(state.chrome())
}

/// `"<filename>.html"` (optionally with a trailing slash) to `"<filename>"`.
fn article_filename(path: &str) -> Option<&str> {
    let path = path.strip_suffix('/').unwrap_or(path);
    path.strip_suffix(ARTICLE_SUFFIX)
        .filter(|filename| !filename.is_empty())
}

#[cfg(test)]
mod tests {
    use super::article_filename;

    #[test]
    fn article_filename_strips_html_suffix() {
        assert_eq!(
            article_filename("2024_03_01-a.md.html"),
            Some("2024_03_01-a.md")
        );
        assert_eq!(
            article_filename("2024_03_01-a.md.html/"),
            Some("2024_03_01-a.md")
        );
        assert_eq!(article_filename("2024_03_01-a.md"), None);
        assert_eq!(article_filename(".html"), None);
    }
}
