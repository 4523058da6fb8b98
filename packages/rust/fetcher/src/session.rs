//! HTTP-backed extraction sessions.
//!
//! Each session owns a fresh cookie-less `reqwest::Client`; dropping the
//! session drops the client and its connection pool.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;
use tracing::{debug, instrument, warn};
use url::Url;

use newscheck_shared::{NewsCheckError, Result};

use crate::adapters::{AdapterRegistry, first_text, selector};
use crate::resolve::{Resolution, batchexecute_request, parse_batchexecute_reply, resolve_wrapper};
use crate::{ContentExtractor, ExtractedArticle, ExtractionSession};

/// Browser-like User-Agent; several portals serve stripped pages to bots.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const MAX_REDIRECTS: usize = 5;

const DEFAULT_NEWS_BASE: &str = "https://news.google.com";

// ---------------------------------------------------------------------------
// HttpExtractor
// ---------------------------------------------------------------------------

/// [`ContentExtractor`] that fetches pages over HTTP.
#[derive(Debug, Clone)]
pub struct HttpExtractor {
    timeout: Duration,
    /// Allow localhost/private IPs (for integration tests with mock servers).
    allow_localhost: bool,
    /// Origin used to decode Google News article ids.
    news_base: String,
}

impl HttpExtractor {
    /// Create an extractor whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            allow_localhost: false,
            news_base: DEFAULT_NEWS_BASE.to_string(),
        }
    }

    /// Decode Google News article ids against `base` instead of the live service.
    pub fn with_news_base(mut self, base: &str) -> Self {
        self.news_base = base.trim_end_matches('/').to_string();
        self
    }

    /// Allow fetching localhost/private IPs (for integration tests).
    pub fn allow_localhost(mut self) -> Self {
        self.allow_localhost = true;
        self
    }
}

#[async_trait]
impl ContentExtractor for HttpExtractor {
    async fn open_session(&self) -> Result<Box<dyn ExtractionSession>> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(self.timeout)
            .build()
            .map_err(|e| NewsCheckError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Box::new(HttpSession {
            client,
            registry: AdapterRegistry::new(),
            allow_localhost: self.allow_localhost,
            news_base: self.news_base.clone(),
        }))
    }
}

// ---------------------------------------------------------------------------
// HttpSession
// ---------------------------------------------------------------------------

/// One scoped extraction session.
pub struct HttpSession {
    client: Client,
    registry: AdapterRegistry,
    allow_localhost: bool,
    news_base: String,
}

impl HttpSession {
    fn guard(&self, url: &Url) -> Result<()> {
        if !self.allow_localhost && is_ssrf_target(url) {
            warn!(%url, "SSRF protection: blocked");
            return Err(NewsCheckError::extraction(url.as_str(), "blocked non-public address"));
        }
        Ok(())
    }

    async fn fetch(&self, url: &Url) -> Result<(String, Url)> {
        debug!(%url, "fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| NewsCheckError::extraction(url.as_str(), format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NewsCheckError::extraction(url.as_str(), format!("HTTP {status}")));
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| NewsCheckError::extraction(url.as_str(), format!("body read failed: {e}")))?;

        debug!(%final_url, bytes = body.len(), "page fetched");
        Ok((body, final_url))
    }

    /// Ask the news service for the publisher URL behind article `id`.
    ///
    /// The article's landing page carries a signature and timestamp that
    /// must accompany the `batchexecute` lookup.
    #[instrument(skip_all, fields(id = %id))]
    async fn decode_news_article(&self, wrapper: &Url, id: &str) -> Result<Url> {
        let fail = |reason: String| NewsCheckError::search_item(wrapper.as_str(), reason);

        let landing = Url::parse(&format!("{}/rss/articles/{id}", self.news_base))
            .map_err(|e| fail(format!("bad news article id: {e}")))?;
        self.guard(&landing)?;
        let (html, _) = self
            .fetch(&landing)
            .await
            .map_err(|e| fail(format!("news article page unavailable: {e}")))?;
        let (signature, timestamp) =
            decoding_params(&html).ok_or_else(|| fail("news article page has no decoding params".into()))?;

        let endpoint = format!("{}/_/DotsSplashUi/data/batchexecute", self.news_base);
        let request = batchexecute_request(id, timestamp, &signature);
        let response = self
            .client
            .post(&endpoint)
            .form(&[("f.req", request.as_str())])
            .send()
            .await
            .map_err(|e| fail(format!("article lookup failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("article lookup returned HTTP {status}")));
        }
        let body = response
            .text()
            .await
            .map_err(|e| fail(format!("article lookup body read failed: {e}")))?;

        parse_batchexecute_reply(&body).ok_or_else(|| fail("article lookup returned no URL".into()))
    }
}

/// `data-n-a-sg` signature and `data-n-a-ts` timestamp from an article page.
fn decoding_params(html: &str) -> Option<(String, i64)> {
    let doc = Html::parse_document(html);
    let sel = selector("[data-n-a-sg][data-n-a-ts]")?;
    let el = doc.select(&sel).next()?;
    let signature = el.value().attr("data-n-a-sg")?.to_string();
    let timestamp = el.value().attr("data-n-a-ts")?.trim().parse().ok()?;
    Some((signature, timestamp))
}

#[async_trait]
impl ExtractionSession for HttpSession {
    async fn resolve(&self, url: &Url) -> Result<Url> {
        let resolved = match resolve_wrapper(url)? {
            Resolution::Direct(target) => target,
            Resolution::NewsArticle(id) => self.decode_news_article(url, &id).await?,
        };
        if resolved != *url {
            debug!(from = %url, to = %resolved, "unwrapped redirect wrapper");
        }
        self.guard(&resolved)?;
        Ok(resolved)
    }

    #[instrument(skip_all, fields(url = %url))]
    async fn extract(&self, url: &Url, raw_html: Option<&str>) -> Result<ExtractedArticle> {
        match raw_html {
            Some(html) => extract_with(&self.registry, html, url),
            None => {
                self.guard(url)?;
                let (html, final_url) = self.fetch(url).await?;
                extract_with(&self.registry, &html, &final_url)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Locate the title and body of a news page with the built-in adapters.
pub fn extract_from_html(html: &str, url: &Url) -> Result<ExtractedArticle> {
    extract_with(&AdapterRegistry::new(), html, url)
}

fn extract_with(registry: &AdapterRegistry, html: &str, url: &Url) -> Result<ExtractedArticle> {
    let doc = Html::parse_document(html);

    let title = extract_title(&doc)
        .ok_or_else(|| NewsCheckError::extraction(url.as_str(), "no title found"))?;

    let (body, adapter) = registry
        .extract_body(&doc, url)
        .ok_or_else(|| NewsCheckError::extraction(url.as_str(), "no article body found"))?;

    debug!(adapter = %adapter, chars = body.chars().count(), "article extracted");

    Ok(ExtractedArticle {
        title,
        body,
        url: url.to_string(),
        adapter,
    })
}

/// `og:title`, then `<title>`, then the first `<h1>`.
fn extract_title(doc: &Html) -> Option<String> {
    let og = selector(r#"meta[property="og:title"]"#).and_then(|sel| {
        doc.select(&sel)
            .filter_map(|el| el.value().attr("content"))
            .map(|content| content.trim().to_string())
            .find(|content| !content.is_empty())
    });

    og.or_else(|| first_text(doc, &["title", "h1"]))
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Whether fetching `url` could reach a non-public host.
fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}
