//! Google News RSS parser.
//!
//! The feed is plain RSS 2.0: one `<item>` per story with a `<title>`
//! (sometimes CDATA-wrapped) and a `<link>` to a Google News redirect page
//! or the publisher. Only those two fields are read.

use std::sync::LazyLock;

use newscheck_shared::{NewsCheckError, Result};
use regex::Regex;
use tracing::debug;
use url::Url;

use crate::SearchHit;

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<item\b[^>]*>(.*?)</item>").expect("item regex"));

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<title\b[^>]*>(.*?)</title>").expect("title regex"));

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<link\b[^>]*>(.*?)</link>").expect("link regex"));

static CDATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*<!\[CDATA\[(.*?)\]\]>\s*$").expect("cdata regex"));

/// `&#123;` and `&#x7B;`.
static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("entity regex"));

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse up to `max_results` hits from an RSS document, in feed order.
///
/// Items without a usable http(s) link are skipped. A document that is not
/// an RSS feed at all is a parse error.
pub(crate) fn parse_rss(content: &str, max_results: usize) -> Result<Vec<SearchHit>> {
    if !content.contains("<rss") && !content.contains("<channel") {
        return Err(NewsCheckError::parse("search response is not an RSS feed"));
    }

    let mut hits = Vec::new();
    for caps in ITEM_RE.captures_iter(content) {
        if hits.len() >= max_results {
            break;
        }
        let item = &caps[1];

        let Some(link) = LINK_RE.captures(item).map(|c| text_content(&c[1])) else {
            debug!("RSS item without link, skipping");
            continue;
        };
        let url = match Url::parse(&link) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            _ => {
                debug!(%link, "RSS item with unusable link, skipping");
                continue;
            }
        };

        let title = TITLE_RE
            .captures(item)
            .map(|c| text_content(&c[1]))
            .filter(|t| !t.is_empty());

        hits.push(SearchHit { url, title });
    }

    Ok(hits)
}

/// Element text: CDATA unwrapped, entities decoded, whitespace trimmed.
fn text_content(raw: &str) -> String {
    match CDATA_RE.captures(raw) {
        Some(caps) => caps[1].trim().to_string(),
        None => unescape(raw.trim()),
    }
}

fn unescape(s: &str) -> String {
    let numeric = NUMERIC_ENTITY_RE.replace_all(s, |caps: &regex::Captures<'_>| {
        let code = &caps[1];
        let value = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        value
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    numeric
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
