//! Credibility scoring.
//!
//! The evaluator never fails. A narrative draft is scored by a
//! schema-constrained completion; every other input, and every problem with
//! that completion, maps to one of the fixed verdicts.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use newscheck_llm::{LanguageModel, Prompt, StructuredSchema, strip_code_fence};
use newscheck_shared::{Draft, DraftKind, FailureKind, NewsCheckError, Result, StageFailure, Verdict};

const EVALUATE_SYSTEM: &str = "You are a news credibility analyst. You score fact-check reports \
                               and answer only with JSON matching the given schema.";

/// Scores drafts into verdicts.
pub struct Evaluator {
    llm: Arc<dyn LanguageModel>,
    timeout: Duration,
    schema: StructuredSchema,
}

impl Evaluator {
    pub fn new(llm: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self {
            llm,
            timeout,
            schema: StructuredSchema::for_type::<Verdict>("credibility_verdict"),
        }
    }

    /// Verdict for the run so far. A recorded failure wins over any draft.
    #[instrument(skip_all)]
    pub async fn evaluate(&self, draft: Option<&Draft>, failure: Option<&StageFailure>) -> Verdict {
        if let Some(failure) = failure {
            warn!(stage = %failure.stage, kind = %failure.kind, detail = %failure.detail, "scoring a failed run");
            return Verdict::failed(failure.kind);
        }

        let Some(draft) = draft else {
            warn!("no draft to score");
            return Verdict::failed(FailureKind::Unexpected);
        };

        match draft.kind {
            DraftKind::NoEvidence => {
                info!("no evidence, using the fixed verdict");
                Verdict::no_evidence(&draft.text)
            }
            DraftKind::Failed => Verdict::failed(FailureKind::Unexpected),
            DraftKind::Narrative => match self.score(&draft.text).await {
                Ok(verdict) => {
                    info!(probability = verdict.overall_fake_probability(), "draft scored");
                    verdict
                }
                Err(e) => {
                    let kind = match e.failure_kind() {
                        FailureKind::Timeout => FailureKind::Timeout,
                        FailureKind::StructuredOutput => FailureKind::StructuredOutput,
                        _ => FailureKind::Unexpected,
                    };
                    warn!(error = %e, %kind, "scoring failed, using the fallback verdict");
                    Verdict::failed(kind)
                }
            },
        }
    }

    async fn score(&self, draft_text: &str) -> Result<Verdict> {
        let prompt = Prompt::new(
            EVALUATE_SYSTEM,
            format!(
                "Score the fact-check report below on each dimension from 0.0 (truthful) to 1.0 (false):\n\
                 - exaggeration: overstated or sensational claims\n\
                 - lack of sources: claims without corroborating reporting\n\
                 - logical errors: unsupported leaps or fallacies\n\
                 Give 1-2 sentences of reasoning per score, an overall probability that the article is fake, \
                 and a one-sentence final judgment. Write the text fields in the report's language.\n\n\
                 ## Fact-check report\n{draft_text}"
            ),
        );

        let raw = tokio::time::timeout(self.timeout, self.llm.complete_structured(&prompt, &self.schema))
            .await
            .map_err(|_| NewsCheckError::timeout("structured completion", self.timeout.as_secs()))??;

        Verdict::from_json(strip_code_fence(&raw))
    }
}
