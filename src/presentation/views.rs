use crate::{
    application::error::{ErrorReport, HttpError},
    config::SiteSettings,
    domain::articles::{ArticleEntry, Catalog},
};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    render_error_page(
        chrome,
        ErrorPageView::not_found(),
        StatusCode::NOT_FOUND,
        ErrorReport::from_message(
            "presentation::views::render_not_found_response",
            StatusCode::NOT_FOUND,
            "Resource not found",
        ),
    )
}

/// Generic 500 page; `report` carries the detail for the response log.
pub fn render_internal_error_response(chrome: LayoutChrome, report: ErrorReport) -> Response {
    render_error_page(
        chrome,
        ErrorPageView::internal(),
        StatusCode::INTERNAL_SERVER_ERROR,
        report,
    )
}

fn render_error_page(
    chrome: LayoutChrome,
    content: ErrorPageView,
    status: StatusCode,
    report: ErrorReport,
) -> Response {
    let view = LayoutContext::new(chrome, content);
    let mut response = render_template_response(ErrorTemplate { view }, status);
    report.attach(&mut response);
    response
}

#[derive(Clone)]
pub struct NavigationLinkView {
    pub label: String,
    pub href: String,
    pub external: bool,
}

#[derive(Clone)]
pub struct BrandView {
    pub title: String,
    pub subtitle: String,
    pub href: String,
}

#[derive(Clone)]
pub struct FooterView {
    pub author: String,
    pub github_url: Option<String>,
}

/// Site furniture shared by every page.
#[derive(Clone)]
pub struct LayoutChrome {
    pub brand: BrandView,
    pub navigation: Vec<NavigationLinkView>,
    pub announcement: String,
    pub footer: FooterView,
}

impl LayoutChrome {
    pub fn from_site(site: &SiteSettings) -> Self {
        let mut navigation = vec![
            NavigationLinkView {
                label: "Home".to_string(),
                href: "/".to_string(),
                external: false,
            },
            NavigationLinkView {
                label: "About".to_string(),
                href: "/aboutme.html".to_string(),
                external: false,
            },
        ];
        if let Some(url) = site.github_url.as_ref() {
            navigation.push(NavigationLinkView {
                label: "GitHub".to_string(),
                href: url.clone(),
                external: true,
            });
        }

        Self {
            brand: BrandView {
                title: site.title.clone(),
                subtitle: site.subtitle.clone(),
                href: "/".to_string(),
            },
            navigation,
            announcement: site.announcement.clone(),
            footer: FooterView {
                author: site.author.clone(),
                github_url: site.github_url.clone(),
            },
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub brand: BrandView,
    pub navigation: Vec<NavigationLinkView>,
    pub announcement: String,
    pub footer: FooterView,
    pub page_title: String,
    pub content: T,
}

impl<T: PageTitle> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        let page_title = match content.page_title() {
            Some(title) if !title.is_empty() => format!("{title} | {}", chrome.brand.title),
            _ => chrome.brand.title.clone(),
        };

        Self {
            brand: chrome.brand,
            navigation: chrome.navigation,
            announcement: chrome.announcement,
            footer: chrome.footer,
            page_title,
            content,
        }
    }
}

/// Document `<title>` prefix contributed by page content.
pub trait PageTitle {
    fn page_title(&self) -> Option<&str>;
}

pub struct IndexEntryView {
    pub title: String,
    pub date: String,
    pub href: String,
}

impl From<&ArticleEntry> for IndexEntryView {
    fn from(entry: &ArticleEntry) -> Self {
        Self {
            title: entry.title.clone(),
            date: entry.date.clone(),
            href: entry.url(),
        }
    }
}

pub struct IndexView {
    pub entries: Vec<IndexEntryView>,
}

impl IndexView {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        Self {
            entries: catalog.iter().map(IndexEntryView::from).collect(),
        }
    }
}

impl PageTitle for IndexView {
    fn page_title(&self) -> Option<&str> {
        None
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<IndexView>,
}

pub struct ArticleView {
    pub title: String,
    pub date: Option<String>,
    /// Sanitised HTML produced by the render pipeline.
    pub body_html: String,
}

impl PageTitle for ArticleView {
    fn page_title(&self) -> Option<&str> {
        Some(&self.title)
    }
}

#[derive(Template)]
#[template(path = "article.html")]
pub struct ArticleTemplate {
    pub view: LayoutContext<ArticleView>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist.".to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }

    pub fn internal() -> Self {
        Self {
            title: "Something Went Wrong".to_string(),
            message: "The page could not be rendered. Please try again later.".to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }
}

impl PageTitle for ErrorPageView {
    fn page_title(&self) -> Option<&str> {
        Some(&self.title)
    }
}

pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: "/".to_string(),
            label: "Back to home".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> SiteSettings {
        SiteSettings {
            title: "Notes".to_string(),
            subtitle: "Sub".to_string(),
            announcement: "Hello <there>".to_string(),
            github_url: Some("https://github.com/example".to_string()),
            author: "someone".to_string(),
        }
    }

    #[test]
    fn index_lists_article_links() {
        let catalog = Catalog::from_entries(vec![ArticleEntry {
            title: "Use <cron>".to_string(),
            date: "2014-06-17".to_string(),
            filename: "2014_06_17-use_cron.rst".to_string(),
        }]);
        let view = LayoutContext::new(
            LayoutChrome::from_site(&site()),
            IndexView::from_catalog(&catalog),
        );

        let html = IndexTemplate { view }.render().expect("renders");

        assert!(html.contains("href=\"/article/2014_06_17-use_cron.rst.html\""));
        assert!(html.contains("Use &#60;cron&#62;") || html.contains("Use &lt;cron&gt;"));
        assert!(html.contains("2014-06-17"));
        assert!(html.contains("https://github.com/example"));
    }

    #[test]
    fn article_body_is_not_escaped() {
        let view = LayoutContext::new(
            LayoutChrome::from_site(&site()),
            ArticleView {
                title: "Hello".to_string(),
                date: Some("2024-03-01".to_string()),
                body_html: "<p>World</p>".to_string(),
            },
        );
        assert_eq!(view.page_title, "Hello | Notes");

        let html = ArticleTemplate { view }.render().expect("renders");
        assert!(html.contains("<p>World</p>"));
        assert!(html.contains("<title>Hello | Notes</title>"));
    }

    #[test]
    fn chrome_omits_github_link_when_unset() {
        let mut site = site();
        site.github_url = None;
        let chrome = LayoutChrome::from_site(&site);
        assert!(chrome.navigation.iter().all(|link| !link.external));
    }
}
