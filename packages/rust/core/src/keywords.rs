//! Search keyword derivation and refinement.
//!
//! Both stages are infallible: when the model fails or answers with nothing
//! usable they fall back to a deterministic query built from their input.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use newscheck_llm::{LanguageModel, Prompt};
use newscheck_shared::{NewsCheckError, Result};

const EXTRACT_SYSTEM: &str = "You turn news headlines into short news search queries.";

const REFINE_SYSTEM: &str = "You broaden news search queries that returned no results.";

/// Quote characters stripped from query tokens.
const QUOTES: &[char] = &['"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}', '`'];

// ---------------------------------------------------------------------------
// KeywordExtractor
// ---------------------------------------------------------------------------

/// Derives the initial search query from the article title.
pub struct KeywordExtractor {
    llm: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl KeywordExtractor {
    pub fn new(llm: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// A single-line query using only words from `title`. An empty title
    /// yields an empty query without calling the model.
    #[instrument(skip_all)]
    pub async fn derive_query(&self, title: &str) -> String {
        let title = collapse_line(title);
        if title.is_empty() {
            return title;
        }

        let prompt = Prompt::new(
            EXTRACT_SYSTEM,
            format!(
                "Extract the 2 to 4 most important keywords from the headline below for a news search.\n\
                 Rules:\n\
                 - Use ONLY words that appear in the headline. Do not add names, places, or facts from outside it.\n\
                 - Keep the headline's language.\n\
                 - Answer with the keywords on a single line separated by spaces, with no numbering, quotes, or explanation.\n\n\
                 Headline: {title}"
            ),
        );

        let query = match complete_with_timeout(self.llm.as_ref(), &prompt, self.timeout).await {
            Ok(text) => keep_title_tokens(&text, &title),
            Err(e) => {
                warn!(error = %e, "keyword extraction failed, searching by title");
                String::new()
            }
        };

        if query.is_empty() {
            debug!("no usable keywords, using the title as the query");
            return title;
        }

        info!(%query, "initial query derived");
        query
    }
}

/// Tokens of the model's answer that begin a word of the title, in answer
/// order. Prefix matching keeps stems whose title form carries a suffix
/// (`서울시` in `서울시가`) without accepting fragments inside a word.
fn keep_title_tokens(answer: &str, title: &str) -> String {
    let title_words: Vec<String> = title
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|word| !word.is_empty())
        .collect();

    collapse_line(answer)
        .split(' ')
        .map(|token| token.trim_matches(QUOTES).trim_matches(|c: char| c == ',' || c == '.'))
        .filter(|token| !token.is_empty())
        .filter(|token| {
            let token = token.to_lowercase();
            let keep = title_words.iter().any(|word| word.starts_with(&token));
            if !keep {
                debug!(token = %token, "dropping keyword not present in title");
            }
            keep
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// KeywordRefiner
// ---------------------------------------------------------------------------

/// Broadens a query that found no evidence.
pub struct KeywordRefiner {
    llm: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl KeywordRefiner {
    pub fn new(llm: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// A broader query reduced to the core actor and action. Falls back to
    /// the first two tokens of `previous`.
    #[instrument(skip_all, fields(previous = %previous))]
    pub async fn refine(&self, previous: &str) -> String {
        let prompt = Prompt::new(
            REFINE_SYSTEM,
            format!(
                "The news search query below found no articles. Rewrite it as a broader query made of \
                 only the core actor and the core action.\n\
                 Drop brand or product names, locations, numbers, and superlatives.\n\
                 Keep the query's language. Answer with the new query on a single line and nothing else.\n\n\
                 Example: \"Samsung Galaxy S25 record sales Seoul\" -> \"Samsung sales\"\n\
                 Example: \"mayor Kim announces largest ever subway expansion in Busan\" -> \"mayor subway expansion\"\n\n\
                 Query: {previous}"
            ),
        );

        let refined = match complete_with_timeout(self.llm.as_ref(), &prompt, self.timeout).await {
            Ok(text) => strip_quotes(&collapse_line(&text)),
            Err(e) => {
                warn!(error = %e, "keyword refinement failed, truncating query");
                String::new()
            }
        };

        let refined = if refined.is_empty() {
            truncate_query(previous)
        } else {
            refined
        };
        info!(query = %refined, "query refined");
        refined
    }
}

/// First two tokens of `query`, quotes removed.
fn truncate_query(query: &str) -> String {
    strip_quotes(query)
        .split_whitespace()
        .take(2)
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_quotes(text: &str) -> String {
    collapse_line(
        &text
            .split_whitespace()
            .map(|token| token.trim_matches(QUOTES))
            .collect::<Vec<_>>()
            .join(" "),
    )
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Collapse any text to one line with single spaces.
pub(crate) fn collapse_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Free-text completion bounded by `timeout`.
pub(crate) async fn complete_with_timeout(
    llm: &dyn LanguageModel,
    prompt: &Prompt,
    timeout: Duration,
) -> Result<String> {
    tokio::time::timeout(timeout, llm.complete(prompt))
        .await
        .map_err(|_| NewsCheckError::timeout("language model completion", timeout.as_secs()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockModel;

    const TITLE: &str = "Mayor announces new subway line for northern districts";

    fn extractor(model: MockModel) -> KeywordExtractor {
        KeywordExtractor::new(Arc::new(model), Duration::from_secs(5))
    }

    fn refiner(model: MockModel) -> KeywordRefiner {
        KeywordRefiner::new(Arc::new(model), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn query_is_single_line_of_title_words() {
        let model = MockModel::new(|_| Ok("  \"Mayor\"  subway\nline \n".into()));
        assert_eq!(extractor(model).derive_query(TITLE).await, "Mayor subway line");
    }

    #[tokio::test]
    async fn words_outside_title_are_dropped() {
        let model = MockModel::new(|_| Ok("Seoul mayor subway 2029".into()));
        assert_eq!(extractor(model).derive_query(TITLE).await, "mayor subway");
    }

    #[tokio::test]
    async fn fragments_inside_title_words_are_dropped() {
        let title = "Budget airline adds northern routes";
        let model = MockModel::new(|_| Ok("line airline route".into()));
        assert_eq!(extractor(model).derive_query(title).await, "airline route");
    }

    #[tokio::test]
    async fn stems_of_suffixed_title_words_are_kept() {
        let title = "서울시가 지하철 10호선 노선을 확정했다";
        let model = MockModel::new(|_| Ok("서울시 10호선 시가".into()));
        assert_eq!(extractor(model).derive_query(title).await, "서울시 10호선");
    }

    #[tokio::test]
    async fn prompt_carries_title_and_constraint() {
        let model = Arc::new(MockModel::new(|_| Ok("subway".into())));
        let extractor = KeywordExtractor::new(model.clone(), Duration::from_secs(5));
        extractor.derive_query(TITLE).await;

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].user.contains(TITLE));
        assert!(prompts[0].user.contains("ONLY words that appear in the headline"));
    }

    #[tokio::test]
    async fn model_failure_falls_back_to_title() {
        assert_eq!(extractor(MockModel::failing()).derive_query(TITLE).await, TITLE);

        let model = MockModel::new(|_| Ok("Busan 2029".into()));
        assert_eq!(extractor(model).derive_query(TITLE).await, TITLE);
    }

    #[tokio::test]
    async fn empty_title_skips_model() {
        let model = Arc::new(MockModel::new(|_| Ok("anything".into())));
        let extractor = KeywordExtractor::new(model.clone(), Duration::from_secs(5));
        assert_eq!(extractor.derive_query("   ").await, "");
        assert!(model.prompts().is_empty());
    }

    #[tokio::test]
    async fn refine_strips_quotes() {
        let model = MockModel::new(|_| Ok("\"mayor subway\"\n".into()));
        assert_eq!(refiner(model).refine("Mayor subway line northern").await, "mayor subway");
    }

    #[tokio::test]
    async fn refine_prompt_has_examples() {
        let model = Arc::new(MockModel::new(|_| Ok("mayor subway".into())));
        let refiner = KeywordRefiner::new(model.clone(), Duration::from_secs(5));
        refiner.refine("Mayor subway line northern").await;
        let user = &model.prompts()[0].user;
        assert!(user.contains("Mayor subway line northern"));
        assert_eq!(user.matches("Example:").count(), 2);
    }

    #[tokio::test]
    async fn refine_falls_back_to_first_two_tokens() {
        assert_eq!(
            refiner(MockModel::failing()).refine("\"Mayor\" subway line northern").await,
            "Mayor subway"
        );

        let model = MockModel::new(|_| Ok(" \"\" ".into()));
        assert_eq!(refiner(model).refine("single").await, "single");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_model_times_out() {
        struct Slow;

        #[async_trait::async_trait]
        impl LanguageModel for Slow {
            async fn complete(&self, _prompt: &Prompt) -> Result<String> {
                tokio::time::sleep(Duration::from_secs(120)).await;
                Ok("late".into())
            }
        }

        let err = complete_with_timeout(&Slow, &Prompt::new("s", "u"), Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, NewsCheckError::Timeout { secs: 60, .. }));
    }
}
