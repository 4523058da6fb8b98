//! Redirect-wrapper resolution for search result links.
//!
//! Search results often point at a wrapper rather than the article:
//! `google.com/url?q=<target>` redirects, or Google News
//! `/articles/<id>` links. Redirects and legacy article ids (a base64
//! protobuf carrying the publisher URL) are unwrapped locally. Current ids
//! (`AU_yq…` payloads) carry no URL and are handed back as
//! [`Resolution::NewsArticle`] for the session to decode online. Anything
//! else passes through and plain HTTP redirects are followed by the fetch.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};
use url::Url;

use newscheck_shared::{NewsCheckError, Result};

/// Outcome of local wrapper resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The article URL, unwrapped or unchanged.
    Direct(Url),
    /// A Google News article id that only the news service can decode.
    NewsArticle(String),
}

/// Resolve `url` to the article it wraps, or return it unchanged.
pub fn resolve_wrapper(url: &Url) -> Result<Resolution> {
    let Some(host) = url.host_str() else {
        return Ok(Resolution::Direct(url.clone()));
    };

    if is_google_host(host) && url.path() == "/url" {
        return unwrap_query_redirect(url).map(Resolution::Direct);
    }

    if host == "news.google.com" {
        if let Some(id) = article_id(url) {
            return Ok(match decode_article_id(id) {
                Some(target) => Resolution::Direct(target),
                None => Resolution::NewsArticle(id.to_string()),
            });
        }
    }

    Ok(Resolution::Direct(url.clone()))
}

fn is_google_host(host: &str) -> bool {
    host == "google.com" || host == "www.google.com" || host.starts_with("www.google.")
}

/// `google.com/url?q=<target>` (or `?url=<target>`).
fn unwrap_query_redirect(url: &Url) -> Result<Url> {
    let target = url
        .query_pairs()
        .find(|(key, _)| key == "q" || key == "url")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| NewsCheckError::search_item(url.as_str(), "redirect without target"))?;

    Url::parse(&target)
        .map_err(|e| NewsCheckError::search_item(url.as_str(), format!("bad redirect target: {e}")))
}

/// The `<id>` in `/articles/<id>` or `/rss/articles/<id>`.
fn article_id(url: &Url) -> Option<&str> {
    let mut segments = url.path_segments()?;
    segments.find(|segment| *segment == "articles")?;
    segments.next().filter(|id| !id.is_empty())
}

/// Decode a legacy article id. The payload embeds the publisher URL as a
/// run of printable ASCII starting at `http`.
fn decode_article_id(id: &str) -> Option<Url> {
    let bytes = URL_SAFE_NO_PAD.decode(id.trim_end_matches('=')).ok()?;
    let start = bytes.windows(4).position(|w| w == b"http")?;
    let end = bytes[start..]
        .iter()
        .position(|b| !(0x21..=0x7e).contains(b))
        .map_or(bytes.len(), |offset| start + offset);

    let candidate = std::str::from_utf8(&bytes[start..end]).ok()?;
    let parsed = Url::parse(candidate).ok()?;
    matches!(parsed.scheme(), "http" | "https").then_some(parsed)
}

// ---------------------------------------------------------------------------
// Online decoding
// ---------------------------------------------------------------------------

/// RPC id of the article-URL lookup on the news service.
const GARTURL_RPC: &str = "Fbv4je";

/// Request body for the `batchexecute` lookup of article `id`, signed with
/// the `signature`/`timestamp` pair from the article's landing page.
pub fn batchexecute_request(id: &str, timestamp: i64, signature: &str) -> String {
    let inner = json!([
        "garturlreq",
        [
            ["X", "X", ["X", "X"], null, null, 1, 1, "US:en", null, 1, null, null, null, null, null, 0, 1],
            "X", "X", 1, [1, 1, 1], 1, 1, null, 0, 0, null, 0
        ],
        id,
        timestamp,
        signature
    ]);
    json!([[[GARTURL_RPC, inner.to_string()]]]).to_string()
}

/// Publisher URL from a `batchexecute` reply.
///
/// The reply is an anti-XSSI prefix, a blank line, then a JSON array of
/// rows; the `wrb.fr` row carries a JSON-encoded `["garturlres", url, ..]`.
pub fn parse_batchexecute_reply(body: &str) -> Option<Url> {
    let (_, payload) = body.split_once("\n\n")?;
    let rows: Value = serde_json::from_str(payload.trim()).ok()?;

    let inner = rows
        .as_array()?
        .iter()
        .find(|row| row.get(0).and_then(Value::as_str) == Some("wrb.fr"))?
        .get(2)?
        .as_str()?;

    let decoded: Value = serde_json::from_str(inner).ok()?;
    let target = Url::parse(decoded.get(1)?.as_str()?).ok()?;
    matches!(target.scheme(), "http" | "https").then_some(target)
}
