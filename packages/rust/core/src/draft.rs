//! Fact-check draft composition.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument};

use newscheck_llm::{LanguageModel, Prompt};
use newscheck_shared::{Article, Draft, Evidence, NewsCheckError, Result};

use crate::evidence::truncate_chars;
use crate::keywords::complete_with_timeout;

const DRAFT_SYSTEM: &str = "You are a careful fact-checker. You compare a news article's claims \
                            against independent reporting and state clearly whether they hold up.";

/// The article body is cut to this many characters before prompting.
const MAX_ARTICLE_CHARS: usize = 4000;

/// Writes the narrative comparison of the article against its evidence.
pub struct DraftComposer {
    llm: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl DraftComposer {
    pub fn new(llm: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// With no evidence, the fixed no-evidence draft (no model call).
    /// Otherwise a model-written narrative; a model failure is an error.
    #[instrument(skip_all, fields(evidence = evidence.len()))]
    pub async fn compose(&self, article: &Article, evidence: &[Evidence], queries: &[String]) -> Result<Draft> {
        if evidence.is_empty() {
            info!("no evidence, using the no-evidence draft");
            return Ok(Draft::no_evidence(queries));
        }

        let prompt = Prompt::new(DRAFT_SYSTEM, draft_request(article, evidence));
        let text = complete_with_timeout(self.llm.as_ref(), &prompt, self.timeout).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(NewsCheckError::LanguageModel("empty fact-check draft".into()));
        }

        info!(chars = text.chars().count(), "draft composed");
        Ok(Draft::narrative(text))
    }
}

fn draft_request(article: &Article, evidence: &[Evidence]) -> String {
    let sources = evidence
        .iter()
        .enumerate()
        .map(|(i, e)| format!("[{}] {}\nSource: {}\nSummary: {}", i + 1, e.title(), e.source_url(), e.summary()))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Compare the claims of the original article with the related reporting below.\n\
         Point out where they agree and where they differ, then end with an explicit conclusion \
         stating whether the original article is true or false. Write in the original article's language.\n\n\
         ## Original article\nTitle: {title}\n\n{body}\n\n## Related reporting\n{sources}",
        title = article.title,
        body = truncate_chars(&article.body, MAX_ARTICLE_CHARS),
    )
}
