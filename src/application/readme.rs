//! Markdown index of the catalog, suitable for a repository README.

use crate::domain::articles::Catalog;

const LICENCE_FOOTER: &str = "[CC-BY](http://opendefinition.org/licenses/cc-by/)";

/// Page furniture surrounding the article list.
#[derive(Debug, Clone)]
pub struct ReadmeHeader<'a> {
    pub title: &'a str,
    pub announcement: &'a str,
    /// Link prefix for article files, relative to the README.
    pub articles_dir: &'a str,
    pub about_file: &'a str,
}

pub fn render_catalog_markdown(header: &ReadmeHeader<'_>, catalog: &Catalog) -> String {
    let dir = header.articles_dir.trim_end_matches('/');
    let mut out = format!("# {}\n\n", header.title);

    if !header.announcement.is_empty() {
        out.push_str(&format!("{}\n\n", header.announcement));
    }
    out.push_str("## About\n\n");
    out.push_str(&format!("[About me]({dir}/{})\n\n", header.about_file));
    out.push_str("## Catalog\n\n");

    for entry in catalog.iter() {
        let line = format!(
            "- {} - [{}]({dir}/{})\n",
            entry.date, entry.title, entry.filename
        );
        out.push_str(&line);
    }

    out.push_str("\n--------------------------------------------\n\n");
    out.push_str(LICENCE_FOOTER);
    out.push('\n');
    out
}
