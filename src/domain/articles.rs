//! Article metadata derived from the files of the content directory.
//!
//! Articles are plain files named `YYYY_MM_DD-<slug>.<ext>`. The filename is the
//! identity of an article: it keys the catalog, the render cache, and the
//! public URL.

use std::path::Path;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use regex::Regex;

use super::error::DomainError;

/// Default article filename pattern; the single capture group is the date.
pub const DEFAULT_FILENAME_PATTERN: &str = r"(\d{4}_\d{2}_\d{2})-.+\..+";

/// Separator used inside the date token of article filenames.
const FILENAME_DATE_SEPARATOR: char = '_';

/// Characters that cannot appear literally inside one URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Markup flavour of an article, selected from its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupKind {
    Markdown,
    ReStructuredText,
    PlainText,
}

impl MarkupKind {
    pub fn from_filename(filename: &str) -> Self {
        match Path::new(filename).extension().and_then(|ext| ext.to_str()) {
            Some("md" | "markdown") => Self::Markdown,
            Some("rst") => Self::ReStructuredText,
            _ => Self::PlainText,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::ReStructuredText => "restructuredtext",
            Self::PlainText => "plaintext",
        }
    }

    /// Turn the first line of an article into its display title.
    ///
    /// Markdown titles lose one leading `"# "`; every other kind keeps the
    /// line as written, decoration included.
    pub fn title_from_first_line(self, line: &str) -> String {
        let line = line.trim_end_matches(['\r', '\n']);
        match self {
            Self::Markdown => line.strip_prefix("# ").unwrap_or(line).to_string(),
            Self::ReStructuredText | Self::PlainText => line.to_string(),
        }
    }
}

/// One row of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleEntry {
    pub title: String,
    pub date: String,
    pub filename: String,
}

impl ArticleEntry {
    /// Public path of the rendered article.
    pub fn url(&self) -> String {
        article_url(&self.filename)
    }
}

/// Public path for `filename`, percent-encoded segment by segment.
pub fn article_url(filename: &str) -> String {
    let encoded = filename
        .split('/')
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/");
    format!("/article/{encoded}.html")
}

/// Ordered article list, newest filename first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<ArticleEntry>,
}

impl Catalog {
    /// Build a catalog, ordering entries by filename descending.
    ///
    /// The sort is stable; with zero-padded date prefixes this is reverse
    /// chronological order.
    pub fn from_entries(mut entries: Vec<ArticleEntry>) -> Self {
        entries.sort_by(|left, right| right.filename.cmp(&left.filename));
        Self { entries }
    }

    pub fn entries(&self) -> &[ArticleEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArticleEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, filename: &str) -> Option<&ArticleEntry> {
        self.entries.iter().find(|entry| entry.filename == filename)
    }
}

/// Compiled article filename matcher.
///
/// Matching is anchored at the start of the filename only, so a pattern
/// behaves as a prefix match.
#[derive(Debug, Clone)]
pub struct FilenamePattern {
    regex: Regex,
    date_separator: String,
}

impl FilenamePattern {
    pub fn new(pattern: &str, date_separator: impl Into<String>) -> Result<Self, DomainError> {
        let regex = Regex::new(&format!("^(?:{pattern})")).map_err(|err| {
            DomainError::validation(format!("invalid article filename pattern: {err}"))
        })?;

        let groups = regex.captures_len() - 1;
        if groups != 1 {
            return Err(DomainError::validation(format!(
                "article filename pattern must have exactly one capture group, found {groups}"
            )));
        }

        Ok(Self {
            regex,
            date_separator: date_separator.into(),
        })
    }

    /// Display date for `filename`, or `None` when it is not an article name.
    pub fn display_date(&self, filename: &str) -> Option<String> {
        let captures = self.regex.captures(filename)?;
        let token = captures.get(1)?.as_str();
        Some(token.replace(FILENAME_DATE_SEPARATOR, &self.date_separator))
    }

}

impl Default for FilenamePattern {
    fn default() -> Self {
        Self::new(DEFAULT_FILENAME_PATTERN, "-").expect("default filename pattern is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(filename: &str) -> ArticleEntry {
        ArticleEntry {
            title: filename.to_string(),
            date: String::new(),
            filename: filename.to_string(),
        }
    }

    #[test]
    fn markdown_title_loses_single_heading_marker() {
        let kind = MarkupKind::from_filename("2024_03_01-hello.md");
        assert_eq!(kind, MarkupKind::Markdown);
        assert_eq!(kind.title_from_first_line("# Hello World\n"), "Hello World");
        assert_eq!(kind.title_from_first_line("## Nested\n"), "## Nested");
    }

    #[test]
    fn other_markup_keeps_first_line_verbatim() {
        let rst = MarkupKind::from_filename("2014_06_17-use_cron.rst");
        assert_eq!(rst, MarkupKind::ReStructuredText);
        assert_eq!(rst.title_from_first_line("Hello\r\n"), "Hello");
        assert_eq!(rst.title_from_first_line("# Hello"), "# Hello");

        let txt = MarkupKind::from_filename("2014_06_17-notes.txt");
        assert_eq!(txt, MarkupKind::PlainText);
    }

    #[test]
    fn empty_first_line_yields_empty_title() {
        assert_eq!(MarkupKind::Markdown.title_from_first_line("\n"), "");
        assert_eq!(MarkupKind::PlainText.title_from_first_line(""), "");
    }

    #[test]
    fn catalog_orders_filenames_descending() {
        let catalog = Catalog::from_entries(vec![
            entry("2023_12_31-b.md"),
            entry("2024_03_01-a.md"),
            entry("2024_01_15-c.rst"),
        ]);

        let names: Vec<_> = catalog.iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(
            names,
            ["2024_03_01-a.md", "2024_01_15-c.rst", "2023_12_31-b.md"]
        );
        assert!(catalog.find("2024_01_15-c.rst").is_some());
        assert!(catalog.find("missing.md").is_none());
    }

    #[test]
    fn default_pattern_extracts_display_date() {
        let pattern = FilenamePattern::default();
        assert_eq!(
            pattern.display_date("2014_06_17-use_cron.rst").as_deref(),
            Some("2014-06-17")
        );
        assert!(pattern.display_date("README.txt").is_none());
        assert!(pattern.display_date("aboutme.md").is_none());
        assert!(pattern.display_date("2014_06_17-no-extension").is_none());
        assert!(pattern.display_date("draft-2014_06_17-late.md").is_none());
    }

    #[test]
    fn custom_separator_is_applied() {
        let pattern = FilenamePattern::new(DEFAULT_FILENAME_PATTERN, "/").expect("valid");
        assert_eq!(
            pattern.display_date("2014_06_17-use_cron.md").as_deref(),
            Some("2014/06/17")
        );
    }

    #[test]
    fn pattern_requires_exactly_one_group() {
        assert!(FilenamePattern::new(r"\d{4}-.+", "-").is_err());
        assert!(FilenamePattern::new(r"(\d{4})_(\d{2})-.+", "-").is_err());
        assert!(FilenamePattern::new(r"(\d{4}", "-").is_err());
    }

    #[test]
    fn article_url_keeps_extension() {
        assert_eq!(entry("2024_03_01-a.md").url(), "/article/2024_03_01-a.md.html");
    }

    #[test]
    fn article_url_escapes_reserved_characters() {
        assert_eq!(
            article_url("2025_01_01-c# and 100%?.md"),
            "/article/2025_01_01-c%23%20and%20100%25%3F.md.html"
        );
        assert_eq!(article_url("2025_01_01-caffè.md"), "/article/2025_01_01-caff%C3%A8.md.html");
    }
}
