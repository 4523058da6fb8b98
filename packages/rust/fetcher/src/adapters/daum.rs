//! Daum News adapter.

use scraper::Html;
use url::Url;

use super::{SiteAdapter, first_text, has_element, host_matches};

const BODY_SELECTORS: &[&str] = &[".article_view", "#harmonyContainer"];

pub struct DaumAdapter;

impl SiteAdapter for DaumAdapter {
    fn detect(&self, doc: &Html, url: &Url) -> bool {
        host_matches(url, "daum.net") || has_element(doc, ".article_view")
    }

    fn extract_body(&self, doc: &Html) -> Option<String> {
        first_text(doc, BODY_SELECTORS)
    }

    fn name(&self) -> &str {
        "daum"
    }
}
