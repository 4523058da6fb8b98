//! Generic (fallback) site adapter.
//!
//! Always matches. Looks for a schema.org article body, then `<article>` and
//! `<main>`, and finally joins every paragraph on the page.

use scraper::Html;
use url::Url;

use super::{SiteAdapter, element_text, first_text, selector};

const BODY_SELECTORS: &[&str] = &[
    r#"[itemprop="articleBody"]"#,
    "article",
    "main",
    r#"[role="main"]"#,
];

/// Generic adapter that works on arbitrary news pages.
pub struct GenericAdapter;

impl SiteAdapter for GenericAdapter {
    fn detect(&self, _doc: &Html, _url: &Url) -> bool {
        true
    }

    fn extract_body(&self, doc: &Html) -> Option<String> {
        first_text(doc, BODY_SELECTORS).or_else(|| paragraph_text(doc))
    }

    fn name(&self) -> &str {
        "generic"
    }
}

/// Last resort: every `<p>` on the page, one per line.
fn paragraph_text(doc: &Html) -> Option<String> {
    let sel = selector("p")?;
    let text = doc
        .select(&sel)
        .map(element_text)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    (!text.is_empty()).then_some(text)
}
