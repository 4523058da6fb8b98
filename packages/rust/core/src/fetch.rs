//! Primary article fetching.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument};
use url::Url;

use newscheck_fetcher::ContentExtractor;
use newscheck_shared::{Article, NewsCheckError, Result};

/// Fetches the article under analysis.
///
/// Every failure (bad URL, unreachable page, timeout, short body) comes back
/// as [`NewsCheckError::Extraction`]. There are no retries.
pub struct ArticleFetcher {
    extractor: Arc<dyn ContentExtractor>,
    timeout: Duration,
    min_chars: usize,
}

impl ArticleFetcher {
    pub fn new(extractor: Arc<dyn ContentExtractor>, timeout: Duration, min_chars: usize) -> Self {
        Self {
            extractor,
            timeout,
            min_chars,
        }
    }

    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch(&self, url: &str) -> Result<Article> {
        let parsed = Url::parse(url)
            .map_err(|e| NewsCheckError::extraction(url, format!("invalid URL: {e}")))?;

        // Dropped on every return path below, which releases the session.
        let session = self
            .extractor
            .open_session()
            .await
            .map_err(|e| as_extraction(url, e))?;

        let extracted = tokio::time::timeout(self.timeout, async {
            let target = session.resolve(&parsed).await?;
            session.extract(&target, None).await
        })
        .await
        .map_err(|_| {
            NewsCheckError::extraction(url, format!("timed out after {}s", self.timeout.as_secs()))
        })?
        .map_err(|e| as_extraction(url, e))?;

        let chars = extracted.body.chars().count();
        debug!(chars, adapter = %extracted.adapter, "primary article extracted");
        if chars < self.min_chars {
            return Err(NewsCheckError::extraction(
                url,
                format!("article body too short ({chars} chars, minimum {})", self.min_chars),
            ));
        }

        info!(title = %extracted.title, chars, "article ready");
        Ok(Article {
            title: extracted.title,
            body: extracted.body,
            url: extracted.url,
        })
    }
}

fn as_extraction(url: &str, error: NewsCheckError) -> NewsCheckError {
    match error {
        NewsCheckError::Extraction { .. } => error,
        other => NewsCheckError::extraction(url, other.to_string()),
    }
}
