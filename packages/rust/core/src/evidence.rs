//! Corroborating evidence gathering.
//!
//! Searches for related coverage, then resolves, fetches, and summarizes each
//! candidate on its own task. A failing candidate is dropped without
//! affecting its siblings, and the output keeps search order.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use newscheck_fetcher::{ContentExtractor, ExtractionSession};
use newscheck_llm::{LanguageModel, Prompt};
use newscheck_search::{SearchHit, SearchProvider, SearchRequest};
use newscheck_shared::{Evidence, NewsCheckError, PipelineConfig, Result, UNSUMMARIZABLE_SUMMARY};

use crate::keywords::complete_with_timeout;

const SUMMARY_SYSTEM: &str = "You summarize news articles accurately and concisely.";

/// Candidate bodies sent for summarization are cut to this many characters.
const MAX_SUMMARY_INPUT_CHARS: usize = 6000;

/// Finds and summarizes related news coverage for a query.
pub struct EvidenceGatherer {
    search: Arc<dyn SearchProvider>,
    extractor: Arc<dyn ContentExtractor>,
    llm: Arc<dyn LanguageModel>,
    config: PipelineConfig,
}

impl EvidenceGatherer {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        extractor: Arc<dyn ContentExtractor>,
        llm: Arc<dyn LanguageModel>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            search,
            extractor,
            llm,
            config,
        }
    }

    /// Evidence for `query`, in search order. Never fails: search errors
    /// yield an empty list and item errors drop the item.
    #[instrument(skip_all, fields(query = %query))]
    pub async fn gather(&self, query: &str) -> Vec<Evidence> {
        let hits = self.search(query).await;
        if hits.is_empty() {
            info!("no search candidates");
            return Vec::new();
        }

        // One session for the whole gather; dropped when this call returns.
        let session: Arc<dyn ExtractionSession> = match self.extractor.open_session().await {
            Ok(session) => Arc::from(session),
            Err(e) => {
                warn!(error = %e, "could not open extraction session, no evidence gathered");
                return Vec::new();
            }
        };

        let total = hits.len();
        let semaphore = Arc::new(Semaphore::new(self.config.gather_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, hit) in hits.into_iter().enumerate() {
            let session = Arc::clone(&session);
            let llm = Arc::clone(&self.llm);
            let sem = Arc::clone(&semaphore);
            let config = self.config.clone();

            tasks.spawn(async move {
                let result = match sem.acquire_owned().await {
                    Ok(_permit) => gather_one(session.as_ref(), llm.as_ref(), &hit, &config).await,
                    Err(_) => Err(NewsCheckError::search_item(hit.url.as_str(), "worker pool closed")),
                };
                (index, hit, result)
            });
        }

        let mut slots: Vec<Option<Evidence>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Ok(evidence))) => slots[index] = Some(evidence),
                Ok((_, hit, Err(e))) => warn!(url = %hit.url, error = %e, "dropping search item"),
                Err(e) => warn!(error = %e, "evidence task panicked, dropping item"),
            }
        }

        let evidence: Vec<Evidence> = slots.into_iter().flatten().collect();
        info!(candidates = total, kept = evidence.len(), "evidence gathered");
        evidence
    }

    async fn search(&self, query: &str) -> Vec<SearchHit> {
        let request = SearchRequest {
            query: query.to_string(),
            language: self.config.language.clone(),
            country: self.config.country.clone(),
            max_results: self.config.max_candidates,
        };

        match tokio::time::timeout(self.config.search_timeout, self.search.search(&request)).await {
            Ok(Ok(mut hits)) => {
                hits.truncate(self.config.max_candidates);
                hits
            }
            Ok(Err(e)) => {
                warn!(error = %e, "news search failed, treating as no results");
                Vec::new()
            }
            Err(_) => {
                warn!(
                    secs = self.config.search_timeout.as_secs(),
                    "news search timed out, treating as no results"
                );
                Vec::new()
            }
        }
    }
}

/// Resolve, fetch, and summarize one candidate.
async fn gather_one(
    session: &dyn ExtractionSession,
    llm: &dyn LanguageModel,
    hit: &SearchHit,
    config: &PipelineConfig,
) -> Result<Evidence> {
    let item_error = |reason: String| NewsCheckError::search_item(hit.url.as_str(), reason);

    let article = tokio::time::timeout(config.fetch_timeout, async {
        let target = session.resolve(&hit.url).await?;
        session.extract(&target, None).await
    })
    .await
    .map_err(|_| item_error(format!("fetch timed out after {}s", config.fetch_timeout.as_secs())))?
    .map_err(|e| item_error(e.to_string()))?;

    let chars = article.body.chars().count();
    let summary = if chars > config.min_summary_chars {
        let prompt = Prompt::new(
            SUMMARY_SYSTEM,
            format!(
                "Summarize the key facts of the following news article in at most 3 sentences, \
                 in the article's language.\n\nTitle: {}\n\n{}",
                article.title,
                truncate_chars(&article.body, MAX_SUMMARY_INPUT_CHARS)
            ),
        );
        let text = complete_with_timeout(llm, &prompt, config.llm_timeout)
            .await
            .map_err(|e| item_error(format!("summarization failed: {e}")))?;
        let text = text.trim();
        if text.is_empty() {
            return Err(item_error("empty summary".into()));
        }
        text.to_string()
    } else {
        debug!(url = %article.url, chars, "body too short to summarize");
        UNSUMMARIZABLE_SUMMARY.to_string()
    };

    let title = hit
        .title
        .as_deref()
        .filter(|_| article.title.trim().is_empty())
        .unwrap_or(&article.title)
        .to_string();

    Ok(Evidence::new(title, summary, article.url))
}

/// At most `max` characters of `text`, cut on a char boundary.
pub(crate) fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
