//! Nate News adapter (`#article_body`).

use scraper::Html;
use url::Url;

use super::{SiteAdapter, first_text, has_element, host_matches};

const BODY_SELECTORS: &[&str] = &["#article_body", "#realArtcContents"];

pub struct NateAdapter;

impl SiteAdapter for NateAdapter {
    fn detect(&self, doc: &Html, url: &Url) -> bool {
        host_matches(url, "nate.com") || has_element(doc, "#article_body")
    }

    fn extract_body(&self, doc: &Html) -> Option<String> {
        first_text(doc, BODY_SELECTORS)
    }

    fn name(&self) -> &str {
        "nate"
    }
}
