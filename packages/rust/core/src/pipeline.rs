//! The fact-check pipeline: a fold over [`Stage`]s.
//!
//! Each stage receives the previous [`PipelineState`] and yields the next
//! one; [`Stage::next`] picks where to go from there. A stage that errors or
//! runs past the run deadline leaves the previous state in place, records a
//! [`StageFailure`], and the run continues at Evaluate, so every run ends
//! with a verdict.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use newscheck_fetcher::ContentExtractor;
use newscheck_llm::LanguageModel;
use newscheck_search::SearchProvider;
use newscheck_shared::{
    Draft, EvidenceStatus, ExtractionStatus, FailureKind, InputKind, NewsCheckError,
    PipelineConfig, PipelineInput, PipelineResult, PipelineState, QueryState, Result, RunId, Stage,
    StageFailure, UNRECOVERABLE_QUERY, Verdict,
};

use crate::draft::DraftComposer;
use crate::evaluate::Evaluator;
use crate::evidence::EvidenceGatherer;
use crate::fetch::ArticleFetcher;
use crate::keywords::{KeywordExtractor, KeywordRefiner};

/// Progress callback for pipeline runs.
pub trait ProgressReporter: Send + Sync {
    /// A stage is about to run.
    fn stage(&self, stage: Stage);
    /// A search finished with `found` evidence items.
    fn evidence(&self, query: &str, found: usize);
    /// The run finished.
    fn done(&self, result: &PipelineResult);
}

/// A no-op progress reporter.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage(&self, _stage: Stage) {}
    fn evidence(&self, _query: &str, _found: usize) {}
    fn done(&self, _result: &PipelineResult) {}
}

/// Runs fact-checks against injected collaborators.
pub struct FactChecker {
    fetcher: ArticleFetcher,
    keywords: KeywordExtractor,
    refiner: KeywordRefiner,
    gatherer: EvidenceGatherer,
    composer: DraftComposer,
    evaluator: Evaluator,
    config: PipelineConfig,
}

impl FactChecker {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        search: Arc<dyn SearchProvider>,
        extractor: Arc<dyn ContentExtractor>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            fetcher: ArticleFetcher::new(
                Arc::clone(&extractor),
                config.fetch_timeout,
                config.min_article_chars,
            ),
            keywords: KeywordExtractor::new(Arc::clone(&llm), config.llm_timeout),
            refiner: KeywordRefiner::new(Arc::clone(&llm), config.llm_timeout),
            gatherer: EvidenceGatherer::new(search, extractor, Arc::clone(&llm), config.clone()),
            composer: DraftComposer::new(Arc::clone(&llm), config.llm_timeout),
            evaluator: Evaluator::new(llm, config.llm_timeout),
            config,
        }
    }

    /// Check one article. Never fails: every problem ends in a fallback verdict.
    pub async fn run_pipeline(&self, input: &str) -> PipelineResult {
        self.run_with_progress(input, &SilentProgress).await
    }

    pub async fn run_with_progress(
        &self,
        input: &str,
        progress: &dyn ProgressReporter,
    ) -> PipelineResult {
        let run_id = RunId::new();
        let started = std::time::Instant::now();

        let state = self
            .drive(&run_id, PipelineInput::classify(input), progress)
            .await;

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let result = state.into_result(run_id, elapsed_ms);
        info!(
            run_id = %result.run_id,
            probability = result.verdict.overall_fake_probability(),
            evidence = result.evidence_items.len(),
            elapsed_ms,
            "fact-check complete"
        );
        progress.done(&result);
        result
    }

    #[instrument(skip_all, fields(run_id = %run_id, input = %input.value))]
    async fn drive(
        &self,
        run_id: &RunId,
        input: PipelineInput,
        progress: &dyn ProgressReporter,
    ) -> PipelineState {
        let deadline = self.config.run_deadline.map(|d| Instant::now() + d);
        let mut state = PipelineState::new(input);
        let mut stage = Stage::ExtractArticle;

        while stage != Stage::Done {
            progress.stage(stage);
            state.trail.push(stage);
            state = match stage {
                Stage::Evaluate => self.evaluate(state, deadline).await,
                _ => self.run_stage(stage, state, deadline).await,
            };
            if matches!(stage, Stage::SearchInitial | Stage::SearchRefined) {
                if let Some(query) = state.current_query.active() {
                    progress.evidence(query, state.evidence.len());
                }
            }
            stage = stage.next(&state);
        }

        progress.stage(Stage::Done);
        state.trail.push(Stage::Done);
        state
    }

    /// Run one pre-Evaluate stage, converting an error or an expired
    /// deadline into a recorded failure on the unchanged state.
    async fn run_stage(
        &self,
        stage: Stage,
        state: PipelineState,
        deadline: Option<Instant>,
    ) -> PipelineState {
        let outcome = match deadline {
            Some(at) => match tokio::time::timeout_at(at, self.step(stage, &state)).await {
                Ok(outcome) => outcome.map_err(|e| stage_failure(stage, &e)),
                Err(_) => Err(self.deadline_failure(stage)),
            },
            None => self
                .step(stage, &state)
                .await
                .map_err(|e| stage_failure(stage, &e)),
        };

        match outcome {
            Ok(next) => next,
            Err(failure) => record_failure(state, failure),
        }
    }

    /// One stage transition: the next state, built from `state`.
    async fn step(&self, stage: Stage, state: &PipelineState) -> Result<PipelineState> {
        let mut next = state.clone();
        match stage {
            Stage::ExtractArticle => self.extract_article(&mut next).await,
            Stage::ExtractKeyword => self.extract_keyword(&mut next).await,
            Stage::SearchInitial | Stage::SearchRefined => self.search(&mut next).await,
            Stage::RefineKeyword => self.refine(&mut next).await,
            Stage::ComposeDraft => self.compose(&mut next).await?,
            Stage::Evaluate | Stage::Done => {
                return Err(NewsCheckError::validation(format!(
                    "stage {stage} is not a pipeline step"
                )));
            }
        }
        Ok(next)
    }

    // -----------------------------------------------------------------------
    // Stages
    // -----------------------------------------------------------------------

    async fn extract_article(&self, state: &mut PipelineState) {
        if state.input.kind == InputKind::Text {
            info!("text input cannot be fact-checked, skipping to evaluation");
            state.extraction = ExtractionStatus::Unsupported;
            mark_unrecoverable(state);
            return;
        }

        match self.fetcher.fetch(&state.input.value).await {
            Ok(article) => {
                state.article = Some(article);
                state.extraction = ExtractionStatus::Extracted;
            }
            Err(e) => {
                warn!(error = %e, "primary article unrecoverable");
                state.extraction = ExtractionStatus::Failed {
                    reason: e.to_string(),
                };
                mark_unrecoverable(state);
            }
        }
    }

    async fn extract_keyword(&self, state: &mut PipelineState) {
        if state.current_query == QueryState::Unrecoverable {
            return;
        }
        let query = self.keywords.derive_query(state.article_title()).await;
        state.search_queries.push(query.clone());
        state.current_query = QueryState::Active(query);
    }

    async fn search(&self, state: &mut PipelineState) {
        let Some(query) = state.current_query.active() else {
            return;
        };
        // A disabled refinement leaves nothing new to search for.
        if state.evidence_status != EvidenceStatus::NotSearched && state.refinements == 0 {
            debug!("refinement disabled, skipping second search");
            return;
        }

        let evidence = self.gatherer.gather(query).await;
        state.evidence_status = if evidence.is_empty() {
            EvidenceStatus::Empty
        } else {
            EvidenceStatus::Found
        };
        state.evidence = evidence;
    }

    async fn refine(&self, state: &mut PipelineState) {
        if !self.config.refine_on_empty {
            debug!("refinement disabled");
            return;
        }
        let Some(previous) = state.current_query.active() else {
            return;
        };

        let refined = self.refiner.refine(previous).await;
        state.search_queries.push(refined.clone());
        state.current_query = QueryState::Active(refined);
        state.refinements += 1;
    }

    async fn compose(&self, state: &mut PipelineState) -> Result<()> {
        let Some(article) = &state.article else {
            return Err(NewsCheckError::validation("no article to compose a draft for"));
        };
        let draft = self
            .composer
            .compose(article, &state.evidence, &state.search_queries)
            .await?;
        state.draft = Some(draft);
        Ok(())
    }

    /// Evaluate never fails. Past the deadline it yields the deadline verdict.
    async fn evaluate(&self, mut state: PipelineState, deadline: Option<Instant>) -> PipelineState {
        if state.draft.is_none() {
            state.draft = Some(match &state.failure {
                Some(failure) => Draft::failed(failure),
                None => Draft::no_evidence(&state.search_queries),
            });
        }

        let scoring = self
            .evaluator
            .evaluate(state.draft.as_ref(), state.failure.as_ref());
        let scored = match deadline {
            Some(at) => tokio::time::timeout_at(at, scoring).await.ok(),
            None => Some(scoring.await),
        };

        let verdict = match scored {
            Some(verdict) => verdict,
            None => {
                let failure = self.deadline_failure(Stage::Evaluate);
                warn!(detail = %failure.detail, "evaluation abandoned");
                if state.failure.is_none() {
                    state.failure = Some(failure);
                }
                Verdict::failed(FailureKind::DeadlineExceeded)
            }
        };

        state.verdict = Some(verdict);
        state
    }

    fn deadline_failure(&self, stage: Stage) -> StageFailure {
        let secs = self.config.run_deadline.map_or(0, |d: Duration| d.as_secs());
        StageFailure {
            stage,
            kind: FailureKind::DeadlineExceeded,
            detail: format!("run deadline of {secs}s exceeded"),
        }
    }
}

// ---------------------------------------------------------------------------
// State helpers
// ---------------------------------------------------------------------------

fn mark_unrecoverable(state: &mut PipelineState) {
    state.search_queries = vec![UNRECOVERABLE_QUERY.to_string()];
    state.current_query = QueryState::Unrecoverable;
    state.evidence_status = EvidenceStatus::Empty;
}

fn stage_failure(stage: Stage, error: &NewsCheckError) -> StageFailure {
    StageFailure {
        stage,
        kind: error.failure_kind(),
        detail: error.to_string(),
    }
}

fn record_failure(mut state: PipelineState, failure: StageFailure) -> PipelineState {
    warn!(stage = %failure.stage, kind = %failure.kind, detail = %failure.detail, "stage failed");
    if state.search_queries.is_empty() {
        state.search_queries.push(UNRECOVERABLE_QUERY.to_string());
    }
    state.failure = Some(failure);
    state
}
