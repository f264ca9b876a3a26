mod config;

use std::sync::Arc;

use comrak::{Arena, format_html, nodes::AstNode, options::Options, parse_document};
use once_cell::sync::Lazy;

use crate::application::render::types::{
    RenderError, RenderOutput, RenderRequest, RenderService,
};
use crate::domain::articles::MarkupKind;

use config::{build_article_sanitizer, default_options};

/// Default rendering pipeline: Comrak for Markdown with Ammonia sanitisation,
/// escaped preformatted text for every other markup kind.
pub struct ComrakRenderService {
    options: Options<'static>,
    sanitizer: ammonia::Builder<'static>,
}

impl ComrakRenderService {
    fn new() -> Self {
        Self {
            options: default_options(),
            sanitizer: build_article_sanitizer(),
        }
    }

    fn render_markdown(&self, request: &RenderRequest) -> Result<String, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, &request.source, &self.options);
        let html = render_html_stage(root, &self.options, &request.filename)?;
        Ok(self.sanitizer.clean(&html).to_string())
    }
}

static RENDER_SERVICE: Lazy<Arc<ComrakRenderService>> =
    Lazy::new(|| Arc::new(ComrakRenderService::new()));

/// Access the shared render service instance, initialised on first use.
pub fn render_service() -> Arc<ComrakRenderService> {
    Arc::clone(&RENDER_SERVICE)
}

impl Default for ComrakRenderService {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderService for ComrakRenderService {
    fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError> {
        let html = match request.markup {
            MarkupKind::Markdown => self.render_markdown(request)?,
            MarkupKind::ReStructuredText | MarkupKind::PlainText => {
                preformatted(&request.source, request.markup)
            }
        };

        Ok(RenderOutput { html })
    }
}

fn render_html_stage<'a>(
    root: &'a AstNode<'a>,
    options: &Options<'static>,
    filename: &str,
) -> Result<String, RenderError> {
    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Markdown {
        filename: filename.to_string(),
        message: err.to_string(),
    })?;
    Ok(html)
}

fn preformatted(source: &str, markup: MarkupKind) -> String {
    format!(
        "<pre class=\"article-source\" data-markup=\"{}\">{}</pre>",
        markup.as_str(),
        ammonia::clean_text(source)
    )
}
