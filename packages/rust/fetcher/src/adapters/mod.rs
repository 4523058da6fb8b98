//! Site adapter trait and built-in adapters for article body extraction.
//!
//! Adapters detect specific Korean news portals (Naver, Nate, Daum) and pull
//! the article body out of their known containers. `GenericAdapter` handles
//! everything else with readability-style heuristics.

mod daum;
mod generic;
mod nate;
mod naver;

use scraper::{ElementRef, Html, Selector};
use url::Url;

pub use daum::DaumAdapter;
pub use generic::GenericAdapter;
pub use nate::NateAdapter;
pub use naver::NaverAdapter;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Trait for site-specific body extraction.
///
/// Adapters are tried in priority order; `GenericAdapter` is the always-last fallback.
pub trait SiteAdapter: Send + Sync {
    /// Returns `true` if this adapter should handle the document.
    fn detect(&self, doc: &Html, url: &Url) -> bool;

    /// Extract the article body as normalized plain text.
    fn extract_body(&self, doc: &Html) -> Option<String>;

    /// Human-readable adapter name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds registered adapters in priority order.
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn SiteAdapter>>,
    fallback: GenericAdapter,
}

impl AdapterRegistry {
    /// Create a registry with all built-in adapters (portal-specific first, generic last).
    pub fn new() -> Self {
        Self {
            adapters: vec![
                Box::new(NaverAdapter),
                Box::new(NateAdapter),
                Box::new(DaumAdapter),
            ],
            fallback: GenericAdapter,
        }
    }

    /// Detect the best adapter for the given HTML document.
    pub fn detect(&self, doc: &Html, url: &Url) -> &dyn SiteAdapter {
        self.adapters
            .iter()
            .find(|adapter| adapter.detect(doc, url))
            .map(|adapter| adapter.as_ref())
            .unwrap_or(&self.fallback as &dyn SiteAdapter)
    }

    /// Extract the body with the detected adapter, falling back to the
    /// generic adapter when a portal container is missing or empty.
    ///
    /// Returns the body and the name of the adapter that produced it.
    pub fn extract_body(&self, doc: &Html, url: &Url) -> Option<(String, String)> {
        let adapter = self.detect(doc, url);
        if let Some(body) = adapter.extract_body(doc) {
            return Some((body, adapter.name().to_string()));
        }
        if adapter.name() == self.fallback.name() {
            return None;
        }
        tracing::debug!(adapter = adapter.name(), %url, "portal container empty, trying generic");
        self.fallback
            .extract_body(doc)
            .map(|body| (body, self.fallback.name().to_string()))
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Text helpers shared by adapters
// ---------------------------------------------------------------------------

/// Parse a CSS selector. Built-in selectors are constants, so a parse
/// failure only drops that selector.
pub(crate) fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Whether any element matches `css`.
pub(crate) fn has_element(doc: &Html, css: &str) -> bool {
    selector(css).is_some_and(|sel| doc.select(&sel).next().is_some())
}

/// Text of the first element matching any of `selectors` (in order) whose
/// normalized text is non-empty.
pub(crate) fn first_text(doc: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|css| {
        let sel = selector(css)?;
        doc.select(&sel)
            .map(element_text)
            .find(|text| !text.is_empty())
    })
}

/// Plain text of an element: script/style and page chrome are skipped,
/// block elements and `<br>` become line breaks, whitespace is normalized.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    push_text(el, &mut raw);
    normalize_lines(&raw)
}

fn push_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            continue;
        }
        let Some(child_el) = ElementRef::wrap(child) else {
            continue;
        };
        match child_el.value().name() {
            "script" | "style" | "noscript" | "iframe" | "nav" | "aside" | "footer"
            | "button" | "form" => {}
            "br" => out.push('\n'),
            "p" | "div" | "li" | "h1" | "h2" | "h3" | "h4" | "blockquote" | "section"
            | "figcaption" | "tr" => {
                out.push('\n');
                push_text(child_el, out);
                out.push('\n');
            }
            _ => push_text(child_el, out),
        }
    }
}

/// Collapse runs of whitespace within each line and drop blank lines.
pub(crate) fn normalize_lines(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether the URL host is `domain` or one of its subdomains.
pub(crate) fn host_matches(url: &Url, domain: &str) -> bool {
    url.host_str().is_some_and(|host| {
        host == domain
            || host
                .strip_suffix(domain)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}
