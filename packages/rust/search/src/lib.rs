//! News Search Service.
//!
//! [`SearchProvider`] is the injectable seam the pipeline searches through.
//! [`GoogleNewsSearch`] implements it over the public Google News RSS
//! search endpoint; it needs no API key.

mod parser;

use std::time::Duration;

use async_trait::async_trait;
use newscheck_shared::{NewsCheckError, Result};
use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

/// User-Agent string for search requests.
const USER_AGENT: &str = concat!("newscheck/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow when fetching the feed.
const MAX_REDIRECTS: usize = 3;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One news search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    /// Interface language, e.g. `ko`.
    pub language: String,
    /// Edition country, e.g. `KR`.
    pub country: String,
    pub max_results: usize,
}

/// A candidate article returned by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Candidate link; may be a redirect wrapper.
    pub url: Url,
    pub title: Option<String>,
}

/// A news search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Up to `request.max_results` candidates in rank order. An empty list
    /// means nothing matched; errors are transport or format failures.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>>;
}

// ---------------------------------------------------------------------------
// Google News
// ---------------------------------------------------------------------------

/// Google News RSS search (`{base}/rss/search?q=…&hl=…&gl=…&ceid=…`).
#[derive(Debug, Clone)]
pub struct GoogleNewsSearch {
    client: Client,
    base_url: Url,
}

impl GoogleNewsSearch {
    /// Create a provider rooted at `base_url` (normally `https://news.google.com`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| NewsCheckError::config(format!("invalid search base URL {base_url}: {e}")))?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()
            .map_err(|e| NewsCheckError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    fn search_url(&self, request: &SearchRequest) -> Result<Url> {
        let mut url = self
            .base_url
            .join("rss/search")
            .map_err(|e| NewsCheckError::config(format!("invalid search base URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("q", &request.query)
            .append_pair("hl", &request.language)
            .append_pair("gl", &request.country)
            .append_pair("ceid", &format!("{}:{}", request.country, request.language));

        Ok(url)
    }
}

#[async_trait]
impl SearchProvider for GoogleNewsSearch {
    #[instrument(skip_all, fields(query = %request.query))]
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        if request.query.trim().is_empty() || request.max_results == 0 {
            debug!("empty query or zero results requested, skipping search");
            return Ok(Vec::new());
        }

        let url = self.search_url(request)?;
        debug!(%url, "querying news search");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| NewsCheckError::Network(format!("news search: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NewsCheckError::Network(format!("news search: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| NewsCheckError::Network(format!("news search: failed to read body: {e}")))?;

        let hits = parser::parse_rss(&body, request.max_results)?;
        info!(hits = hits.len(), "news search complete");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(query: &str) -> SearchRequest {
        SearchRequest {
            query: query.into(),
            language: "ko".into(),
            country: "KR".into(),
            max_results: 3,
        }
    }

    #[test]
    fn search_url_carries_locale() {
        let search = GoogleNewsSearch::new("https://news.google.com", Duration::from_secs(5)).unwrap();
        let url = search.search_url(&request("\"line 10\" subway")).unwrap();
        assert_eq!(url.path(), "/rss/search");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("q".into(), "\"line 10\" subway".into())));
        assert!(pairs.contains(&("hl".into(), "ko".into())));
        assert!(pairs.contains(&("gl".into(), "KR".into())));
        assert!(pairs.contains(&("ceid".into(), "KR:ko".into())));
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let err = GoogleNewsSearch::new("not a url", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, NewsCheckError::Config { .. }));
    }

    #[tokio::test]
    async fn search_with_mock_server() {
        let server = MockServer::start().await;
        let feed = std::fs::read_to_string("../../../fixtures/rss/google-news.xml")
            .expect("read rss fixture");

        Mock::given(method("GET"))
            .and(path("/rss/search"))
            .and(query_param("q", "subway line 10"))
            .and(query_param("ceid", "KR:ko"))
            .respond_with(ResponseTemplate::new(200).set_body_string(feed))
            .expect(1)
            .mount(&server)
            .await;

        let search = GoogleNewsSearch::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let hits = search.search(&request("subway line 10")).await.unwrap();

        assert_eq!(hits.len(), 3);
        assert_eq!(
            hits[1].url.as_str(),
            "https://www.hani.co.kr/arti/society/area/1175000.html"
        );
    }

    #[tokio::test]
    async fn empty_query_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let search = GoogleNewsSearch::new(&server.uri(), Duration::from_secs(5)).unwrap();
        assert!(search.search(&request("   ")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn http_error_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let search = GoogleNewsSearch::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let err = search.search(&request("anything")).await.unwrap_err();
        assert!(matches!(err, NewsCheckError::Network(_)));
        assert!(err.to_string().contains("503"));
    }
}
