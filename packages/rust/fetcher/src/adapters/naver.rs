//! Naver News adapter.
//!
//! Current article pages keep the body in `#dic_area`; older layouts (and
//! sports/entertainment mirrors) use `#articleBodyContents`.

use scraper::Html;
use url::Url;

use super::{SiteAdapter, first_text, has_element, host_matches};

const BODY_SELECTORS: &[&str] = &["#dic_area", "#articleBodyContents"];

pub struct NaverAdapter;

impl SiteAdapter for NaverAdapter {
    fn detect(&self, doc: &Html, url: &Url) -> bool {
        host_matches(url, "naver.com") || BODY_SELECTORS.iter().any(|css| has_element(doc, css))
    }

    fn extract_body(&self, doc: &Html) -> Option<String> {
        first_text(doc, BODY_SELECTORS)
    }

    fn name(&self) -> &str {
        "naver"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_container() {
        let doc = Html::parse_document(
            r#"<html><body><div id="articleBodyContents">
               <!-- body --> Legacy layout body text.<br><br>Second paragraph.
               </div></body></html>"#,
        );
        assert_eq!(
            NaverAdapter.extract_body(&doc).as_deref(),
            Some("Legacy layout body text.\nSecond paragraph.")
        );
    }

    #[test]
    fn detects_by_container_on_foreign_host() {
        let doc = Html::parse_document(r#"<div id="dic_area">x</div>"#);
        let url = Url::parse("https://mirror.example.com/a").unwrap();
        assert!(NaverAdapter.detect(&doc, &url));
    }
}
