//! Content Extraction Service: news page fetching, site adapters, and
//! redirect-wrapper resolution.
//!
//! This crate provides:
//! - [`ContentExtractor`] / [`ExtractionSession`]: the injectable extraction seam
//! - [`HttpExtractor`]: reqwest-backed implementation with SSRF protection
//! - [`adapters`]: site-specific article body extractors (Naver, Nate, Daum, generic)
//! - [`resolve`]: unwrapping of search-result redirect wrappers

pub mod adapters;
pub mod resolve;
pub mod session;

use async_trait::async_trait;
use url::Url;

use newscheck_shared::Result;

pub use adapters::{AdapterRegistry, DaumAdapter, GenericAdapter, NateAdapter, NaverAdapter, SiteAdapter};
pub use session::{HttpExtractor, HttpSession, extract_from_html};

/// Title and body text located in a news page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArticle {
    pub title: String,
    pub body: String,
    /// Final URL after redirects.
    pub url: String,
    /// Name of the adapter that located the body.
    pub adapter: String,
}

/// Factory for extraction sessions.
///
/// A session is the unit of resource ownership (HTTP client, connection pool).
/// Callers open one per operation and drop it when done; dropping releases it.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn ExtractionSession>>;
}

/// One scoped extraction session.
#[async_trait]
pub trait ExtractionSession: Send + Sync {
    /// Resolve a redirect/shortener wrapper to the article URL.
    async fn resolve(&self, url: &Url) -> Result<Url>;

    /// Extract title and body from `url`, or from `raw_html` when supplied.
    async fn extract(&self, url: &Url, raw_html: Option<&str>) -> Result<ExtractedArticle>;
}
