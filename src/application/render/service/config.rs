use std::{borrow::Cow, collections::HashSet};

use ammonia::Builder as AmmoniaBuilder;
use comrak::options::Options;

pub(crate) fn default_options() -> Options<'static> {
    let mut options = Options::default();
    configure_extensions(&mut options);
    options
}

/// Sanitiser for article bodies: the usual prose and table tags, figures,
/// media embeds, and inline `style` attributes filtered to safe declarations.
pub(crate) fn build_article_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "abbr",
        "audio",
        "blockquote",
        "br",
        "code",
        "dd",
        "del",
        "div",
        "dl",
        "dt",
        "em",
        "figcaption",
        "figure",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "i",
        "img",
        "input",
        "kbd",
        "li",
        "mark",
        "ol",
        "p",
        "pre",
        "s",
        "section",
        "source",
        "span",
        "strong",
        "sub",
        "sup",
        "table",
        "tbody",
        "td",
        "th",
        "thead",
        "tr",
        "u",
        "ul",
        "video",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> = HashSet::from([
        "class",
        "id",
        "title",
        "lang",
        "dir",
        "style",
        "aria-hidden",
        "aria-label",
        "role",
        "data-footnote-ref",
        "data-footnotes",
        "data-footnote-backref",
    ]);
    builder.generic_attributes(generic);

    builder.add_tag_attributes("img", &["width", "height", "alt", "loading"]);
    builder.add_tag_attributes("code", &["data-language"]);
    builder.add_tag_attributes("pre", &["lang", "data-language"]);
    builder.add_tag_attributes("th", &["align", "colspan", "rowspan", "scope"]);
    builder.add_tag_attributes("td", &["align", "colspan", "rowspan"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled"]);
    builder.add_tag_attributes("video", &["controls", "width", "height", "poster"]);
    builder.add_tag_attributes("audio", &["controls"]);
    builder.add_tag_attributes("source", &["src", "type"]);

    builder.attribute_filter(|_element, attribute, value| {
        if attribute.eq_ignore_ascii_case("style") {
            sanitize_style_attribute(value).map(Cow::Owned)
        } else {
            Some(Cow::Borrowed(value))
        }
    });

    builder.add_url_schemes(["http", "https", "mailto"].iter().copied());

    builder
}

fn configure_extensions(options: &mut Options<'static>) {
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.superscript = true;
    ext.footnotes = true;
    ext.description_lists = true;
    ext.front_matter_delimiter = Some("---".to_string());

    let render = &mut options.render;
    render.github_pre_lang = true;
    render.r#unsafe = true;
    render.figure_with_caption = true;
}

fn sanitize_style_attribute(value: &str) -> Option<String> {
    let kept: Vec<&str> = value
        .split(';')
        .map(str::trim)
        .filter(|decl| !decl.is_empty() && is_safe_style_declaration(decl))
        .collect();

    (!kept.is_empty()).then(|| kept.join("; "))
}

fn is_safe_style_declaration(decl: &str) -> bool {
    const FORBIDDEN: [&str; 8] = [
        "expression(",
        "javascript:",
        "vbscript:",
        "-moz-binding",
        "behavior:",
        "behaviour:",
        "@import",
        "url(",
    ];

    let lower = decl.to_ascii_lowercase();
    !FORBIDDEN.iter().any(|needle| lower.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::{build_article_sanitizer, sanitize_style_attribute};

    #[test]
    fn style_attribute_keeps_plain_declarations() {
        assert_eq!(
            sanitize_style_attribute("color: red; padding: 4px;").as_deref(),
            Some("color: red; padding: 4px")
        );
    }

    #[test]
    fn style_attribute_drops_scriptable_declarations() {
        assert_eq!(
            sanitize_style_attribute("color: red; background: url('javascript:alert(1)')")
                .as_deref(),
            Some("color: red")
        );
        assert!(sanitize_style_attribute("width: expression(alert(1))").is_none());
    }

    #[test]
    fn sanitizer_strips_event_handlers() {
        let html = build_article_sanitizer()
            .clean("<p onclick=\"evil()\">Hi <u>there</u></p>")
            .to_string();

        assert_eq!(html, "<p>Hi <u>there</u></p>");
    }
}
