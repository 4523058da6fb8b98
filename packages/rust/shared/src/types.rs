//! Core domain types for a fact-check pipeline run.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{NewsCheckError, Result};

/// Marker recorded in the query trail when the primary article was unrecoverable.
pub const UNRECOVERABLE_QUERY: &str = "<no-article>";

/// Summary text for a candidate whose body was too short to summarize.
pub const UNSUMMARIZABLE_SUMMARY: &str =
    "The article body could not be extracted or was too short to summarize.";

/// Reasoning used by the no-evidence verdict for the undecidable dimensions.
const INSUFFICIENT_BASIS_REASONING: &str =
    "There is insufficient basis for a judgment, so the score is set to 0.5.";

/// Reasoning used by the no-evidence verdict for the source dimension.
const NO_SOURCES_REASONING: &str =
    "No related articles were found, so the lack-of-sources score is set to 1.0.";

/// Reasoning used by every dimension of the failure verdict.
const ANALYSIS_FAILED_REASONING: &str =
    "Analysis failed: the language model call or structured output parsing did not succeed.";

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// What the caller submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Url,
    Text,
}

/// The raw submission for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineInput {
    pub kind: InputKind,
    pub value: String,
}

impl PipelineInput {
    /// Classify raw input: anything starting with `http://` or `https://` is a URL.
    pub fn classify(raw: &str) -> Self {
        let value = raw.trim().to_string();
        let kind = if value.starts_with("http://") || value.starts_with("https://") {
            InputKind::Url
        } else {
            InputKind::Text
        };
        Self { kind, value }
    }
}

// ---------------------------------------------------------------------------
// Stage / status enums
// ---------------------------------------------------------------------------

/// A state of the pipeline state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ExtractArticle,
    ExtractKeyword,
    SearchInitial,
    RefineKeyword,
    SearchRefined,
    ComposeDraft,
    Evaluate,
    Done,
}

impl Stage {
    /// Stable name used in logs and progress output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtractArticle => "extract_article",
            Self::ExtractKeyword => "extract_keyword",
            Self::SearchInitial => "search_initial",
            Self::RefineKeyword => "refine_keyword",
            Self::SearchRefined => "search_refined",
            Self::ComposeDraft => "compose_draft",
            Self::Evaluate => "evaluate",
            Self::Done => "done",
        }
    }

    /// The stage that follows `self` given the state it produced.
    ///
    /// A recorded failure sends any pre-Evaluate stage straight to Evaluate.
    /// Refinement happens at most once: SearchRefined never leads back to
    /// RefineKeyword.
    pub fn next(self, state: &PipelineState) -> Stage {
        if state.failure.is_some() && !matches!(self, Self::Evaluate | Self::Done) {
            return Self::Evaluate;
        }
        match self {
            Self::ExtractArticle => Self::ExtractKeyword,
            Self::ExtractKeyword => Self::SearchInitial,
            Self::SearchInitial => match state.current_query {
                QueryState::Unrecoverable => Self::Evaluate,
                _ if !state.evidence.is_empty() => Self::ComposeDraft,
                _ => Self::RefineKeyword,
            },
            Self::RefineKeyword => Self::SearchRefined,
            Self::SearchRefined => Self::ComposeDraft,
            Self::ComposeDraft => Self::Evaluate,
            Self::Evaluate | Self::Done => Self::Done,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of primary article extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionStatus {
    Pending,
    Extracted,
    Failed { reason: String },
    /// Non-URL input; text-mode analysis is not supported.
    Unsupported,
}

impl ExtractionStatus {
    /// True when downstream stages have nothing to work with.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Unsupported)
    }
}

/// The active search keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryState {
    Unset,
    Active(String),
    /// Extraction failed; every stage up to Evaluate is skipped.
    Unrecoverable,
}

impl QueryState {
    /// The active query string, if any.
    pub fn active(&self) -> Option<&str> {
        match self {
            Self::Active(q) => Some(q),
            _ => None,
        }
    }
}

/// Whether corroborating sources have been looked for, and found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceStatus {
    NotSearched,
    Found,
    Empty,
}

/// Failure taxonomy used to label fallback verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Extraction,
    SearchItem,
    StructuredOutput,
    Timeout,
    DeadlineExceeded,
    Unexpected,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extraction => "extraction failure",
            Self::SearchItem => "search item failure",
            Self::StructuredOutput => "structured output failure",
            Self::Timeout => "timeout",
            Self::DeadlineExceeded => "run deadline exceeded",
            Self::Unexpected => "unexpected failure",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage error that routed the run straight to Evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub kind: FailureKind,
    pub detail: String,
}

// ---------------------------------------------------------------------------
// Article / Evidence / Draft
// ---------------------------------------------------------------------------

/// The primary article as extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub body: String,
    /// Final URL after redirects.
    pub url: String,
}

/// One summarized corroborating source. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    title: String,
    summary: String,
    source_url: String,
}

impl Evidence {
    pub fn new(
        title: impl Into<String>,
        summary: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            source_url: source_url.into(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }
}

/// How a draft came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftKind {
    /// Model-written comparison of the article against evidence.
    Narrative,
    /// Canned text: no corroborating sources, judgment impossible.
    NoEvidence,
    /// Placeholder written after a stage failure.
    Failed,
}

/// The narrative fact-check text handed to Evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub text: String,
    pub kind: DraftKind,
}

impl Draft {
    pub fn narrative(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: DraftKind::Narrative,
        }
    }

    /// The fixed "judgment impossible" draft. Queries equal to
    /// [`UNRECOVERABLE_QUERY`] are not quoted back to the reader.
    pub fn no_evidence(queries: &[String]) -> Self {
        let quoted: Vec<String> = queries
            .iter()
            .filter(|q| q.as_str() != UNRECOVERABLE_QUERY)
            .map(|q| format!("\"{q}\""))
            .collect();

        let lead = if quoted.is_empty() {
            "The news search found no corroborating sources for this article.".to_string()
        } else {
            format!(
                "A news search for {} found no corroborating sources.",
                quoted.join(", ")
            )
        };

        Self {
            text: format!(
                "{lead} Without related news coverage, a fact-check judgment is impossible. \
                 Check the source and credibility of this information yourself."
            ),
            kind: DraftKind::NoEvidence,
        }
    }

    pub fn failed(failure: &StageFailure) -> Self {
        Self {
            text: format!(
                "The fact-check could not be completed ({} during {}): {}",
                failure.kind, failure.stage, failure.detail
            ),
            kind: DraftKind::Failed,
        }
    }
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// Structured credibility verdict. Scores run from 0.0 (truthful) to 1.0 (false).
///
/// Every instance satisfies the range and non-empty invariants: the
/// constructors build valid verdicts, and deserialization (from the model or
/// from a stored [`PipelineResult`]) rejects anything else.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct Verdict {
    /// Exaggeration score (0.0 = truthful, 1.0 = false).
    exaggeration_score: f64,
    /// Brief reasoning for the exaggeration score (1-2 sentences).
    exaggeration_reasoning: String,
    /// Lack-of-sources score (0.0 = well sourced, 1.0 = unsourced).
    lack_of_sources_score: f64,
    /// Brief reasoning for the lack-of-sources score (1-2 sentences).
    lack_of_sources_reasoning: String,
    /// Logical errors score (0.0 = sound, 1.0 = fallacious).
    logical_errors_score: f64,
    /// Brief reasoning for the logical errors score (1-2 sentences).
    logical_errors_reasoning: String,
    /// Overall probability that the article is fake (0.0 = true, 1.0 = false).
    overall_fake_probability: f64,
    /// Final judgment summarizing the scores in one sentence.
    final_judgment: String,
}

/// Wire shape of [`Verdict`] before its invariants are checked.
#[derive(Deserialize)]
struct RawVerdict {
    exaggeration_score: f64,
    exaggeration_reasoning: String,
    lack_of_sources_score: f64,
    lack_of_sources_reasoning: String,
    logical_errors_score: f64,
    logical_errors_reasoning: String,
    overall_fake_probability: f64,
    final_judgment: String,
}

impl<'de> Deserialize<'de> for Verdict {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawVerdict::deserialize(deserializer)?;
        let verdict = Verdict {
            exaggeration_score: raw.exaggeration_score,
            exaggeration_reasoning: raw.exaggeration_reasoning,
            lack_of_sources_score: raw.lack_of_sources_score,
            lack_of_sources_reasoning: raw.lack_of_sources_reasoning,
            logical_errors_score: raw.logical_errors_score,
            logical_errors_reasoning: raw.logical_errors_reasoning,
            overall_fake_probability: raw.overall_fake_probability,
            final_judgment: raw.final_judgment,
        };
        match verdict.violation() {
            Some(reason) => Err(serde::de::Error::custom(reason)),
            None => Ok(verdict),
        }
    }
}

impl Verdict {
    /// Decode a JSON object and check every invariant.
    ///
    /// Missing fields, non-numeric scores, scores outside `[0.0, 1.0]`, and
    /// blank reasoning all map to [`NewsCheckError::StructuredOutput`].
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| NewsCheckError::StructuredOutput(format!("invalid verdict JSON: {e}")))
    }

    /// Fixed verdict for runs with no corroborating evidence.
    pub fn no_evidence(draft_text: &str) -> Self {
        Self {
            exaggeration_score: 0.5,
            exaggeration_reasoning: INSUFFICIENT_BASIS_REASONING.into(),
            lack_of_sources_score: 1.0,
            lack_of_sources_reasoning: NO_SOURCES_REASONING.into(),
            logical_errors_score: 0.5,
            logical_errors_reasoning: INSUFFICIENT_BASIS_REASONING.into(),
            overall_fake_probability: 0.7,
            final_judgment: draft_text.to_string(),
        }
    }

    /// Pessimistic fallback: everything maximally untrustworthy.
    pub fn failed(kind: FailureKind) -> Self {
        Self {
            exaggeration_score: 1.0,
            exaggeration_reasoning: ANALYSIS_FAILED_REASONING.into(),
            lack_of_sources_score: 1.0,
            lack_of_sources_reasoning: ANALYSIS_FAILED_REASONING.into(),
            logical_errors_score: 1.0,
            logical_errors_reasoning: ANALYSIS_FAILED_REASONING.into(),
            overall_fake_probability: 1.0,
            final_judgment: format!("Credibility analysis failed: {kind}."),
        }
    }

    /// The first broken invariant, if any.
    fn violation(&self) -> Option<String> {
        let scores = [
            ("exaggeration_score", self.exaggeration_score),
            ("lack_of_sources_score", self.lack_of_sources_score),
            ("logical_errors_score", self.logical_errors_score),
            ("overall_fake_probability", self.overall_fake_probability),
        ];
        for (name, value) in scores {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Some(format!("{name} = {value} is outside [0.0, 1.0]"));
            }
        }

        let texts = [
            ("exaggeration_reasoning", &self.exaggeration_reasoning),
            ("lack_of_sources_reasoning", &self.lack_of_sources_reasoning),
            ("logical_errors_reasoning", &self.logical_errors_reasoning),
            ("final_judgment", &self.final_judgment),
        ];
        texts
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| format!("{name} is empty"))
    }

    pub fn exaggeration_score(&self) -> f64 {
        self.exaggeration_score
    }

    pub fn exaggeration_reasoning(&self) -> &str {
        &self.exaggeration_reasoning
    }

    pub fn lack_of_sources_score(&self) -> f64 {
        self.lack_of_sources_score
    }

    pub fn lack_of_sources_reasoning(&self) -> &str {
        &self.lack_of_sources_reasoning
    }

    pub fn logical_errors_score(&self) -> f64 {
        self.logical_errors_score
    }

    pub fn logical_errors_reasoning(&self) -> &str {
        &self.logical_errors_reasoning
    }

    pub fn overall_fake_probability(&self) -> f64 {
        self.overall_fake_probability
    }

    pub fn final_judgment(&self) -> &str {
        &self.final_judgment
    }
}

// ---------------------------------------------------------------------------
// PipelineState
// ---------------------------------------------------------------------------

/// The record threaded through the workflow. Stages take it by value and
/// return the next value.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub input: PipelineInput,
    pub article: Option<Article>,
    pub extraction: ExtractionStatus,
    /// Every query attempted, oldest first. Append-only.
    pub search_queries: Vec<String>,
    pub current_query: QueryState,
    pub evidence: Vec<Evidence>,
    pub evidence_status: EvidenceStatus,
    pub refinements: u32,
    pub draft: Option<Draft>,
    pub failure: Option<StageFailure>,
    pub verdict: Option<Verdict>,
    /// Stages visited, in order.
    pub trail: Vec<Stage>,
}

impl PipelineState {
    /// Fresh state for one run.
    pub fn new(input: PipelineInput) -> Self {
        Self {
            input,
            article: None,
            extraction: ExtractionStatus::Pending,
            search_queries: Vec::new(),
            current_query: QueryState::Unset,
            evidence: Vec::new(),
            evidence_status: EvidenceStatus::NotSearched,
            refinements: 0,
            draft: None,
            failure: None,
            verdict: None,
            trail: Vec::new(),
        }
    }

    /// Title of the primary article, empty until extraction succeeds.
    pub fn article_title(&self) -> &str {
        self.article.as_ref().map(|a| a.title.as_str()).unwrap_or("")
    }

    /// Freeze the state into the caller-facing snapshot.
    pub fn into_result(self, run_id: RunId, elapsed_ms: u64) -> PipelineResult {
        let article_title = self.article_title().to_string();
        let verdict = self
            .verdict
            .unwrap_or_else(|| Verdict::failed(FailureKind::Unexpected));
        let draft_text = self
            .draft
            .map(|d| d.text)
            .unwrap_or_else(|| verdict.final_judgment().to_string());

        PipelineResult {
            run_id,
            input: self.input,
            article_title,
            extraction: self.extraction,
            search_queries: self.search_queries,
            evidence_items: self.evidence,
            draft_text,
            verdict,
            failure: self.failure,
            trail: self.trail,
            completed_at: Utc::now(),
            elapsed_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineResult
// ---------------------------------------------------------------------------

/// Immutable snapshot returned to the caller once the run reaches Done.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub run_id: RunId,
    pub input: PipelineInput,
    pub article_title: String,
    pub extraction: ExtractionStatus,
    pub search_queries: Vec<String>,
    pub evidence_items: Vec<Evidence>,
    pub draft_text: String,
    pub verdict: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<StageFailure>,
    pub trail: Vec<Stage>,
    pub completed_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "exaggeration_score": 0.2,
        "exaggeration_reasoning": "Claims match coverage.",
        "lack_of_sources_score": 0.1,
        "lack_of_sources_reasoning": "Three outlets report it.",
        "logical_errors_score": 0.0,
        "logical_errors_reasoning": "No fallacies found.",
        "overall_fake_probability": 0.15,
        "final_judgment": "Likely true."
    }"#;

    #[test]
    fn classify_input() {
        let url = PipelineInput::classify("  https://news.example.com/a  ");
        assert_eq!(url.kind, InputKind::Url);
        assert_eq!(url.value, "https://news.example.com/a");

        let text = PipelineInput::classify("The mayor resigned today");
        assert_eq!(text.kind, InputKind::Text);
    }

    #[test]
    fn verdict_from_valid_json_keeps_values() {
        let verdict = Verdict::from_json(VALID).expect("valid verdict");
        assert_eq!(verdict.exaggeration_score(), 0.2);
        assert_eq!(verdict.lack_of_sources_score(), 0.1);
        assert_eq!(verdict.logical_errors_score(), 0.0);
        assert_eq!(verdict.overall_fake_probability(), 0.15);
        assert_eq!(verdict.lack_of_sources_reasoning(), "Three outlets report it.");
        assert_eq!(verdict.final_judgment(), "Likely true.");
    }

    #[test]
    fn verdict_accepts_bounds() {
        let json = VALID
            .replace("\"exaggeration_score\": 0.2", "\"exaggeration_score\": 1.0")
            .replace("\"logical_errors_score\": 0.0", "\"logical_errors_score\": 0");
        let verdict = Verdict::from_json(&json).expect("bounds are inclusive");
        assert_eq!(verdict.exaggeration_score(), 1.0);
        assert_eq!(verdict.logical_errors_score(), 0.0);
    }

    #[test]
    fn verdict_rejects_out_of_range() {
        let json = VALID.replace("\"exaggeration_score\": 0.2", "\"exaggeration_score\": 1.5");
        let err = Verdict::from_json(&json).unwrap_err();
        assert!(matches!(err, NewsCheckError::StructuredOutput(_)));
        assert!(err.to_string().contains("exaggeration_score"));
    }

    #[test]
    fn verdict_rejects_missing_field() {
        let json = VALID.replace("\"final_judgment\": \"Likely true.\"", "\"extra\": 1");
        let err = Verdict::from_json(&json).unwrap_err();
        assert!(matches!(err, NewsCheckError::StructuredOutput(_)));
    }

    #[test]
    fn verdict_rejects_blank_reasoning() {
        let json = VALID.replace("No fallacies found.", "  ");
        assert!(Verdict::from_json(&json).is_err());
    }

    #[test]
    fn verdict_rejects_string_score() {
        let json = VALID.replace("0.15", "\"low\"");
        assert!(Verdict::from_json(&json).is_err());
    }

    #[test]
    fn fixed_verdicts() {
        let draft = Draft::no_evidence(&["mayor resign".into()]);
        let v = Verdict::no_evidence(&draft.text);
        assert_eq!(v.lack_of_sources_score(), 1.0);
        assert_eq!(v.overall_fake_probability(), 0.7);
        assert_eq!(v.final_judgment(), draft.text);

        let v = Verdict::failed(FailureKind::StructuredOutput);
        assert_eq!(v.exaggeration_score(), 1.0);
        assert_eq!(v.overall_fake_probability(), 1.0);
        assert!(v.final_judgment().contains("structured output failure"));
    }

    #[test]
    fn no_evidence_draft_text() {
        let draft = Draft::no_evidence(&["a b c".into(), "a b".into()]);
        assert_eq!(draft.kind, DraftKind::NoEvidence);
        assert!(draft.text.contains("\"a b c\", \"a b\""));
        assert!(draft.text.contains("no corroborating sources"));
        assert!(draft.text.contains("judgment is impossible"));

        let draft = Draft::no_evidence(&[UNRECOVERABLE_QUERY.to_string()]);
        assert!(!draft.text.contains(UNRECOVERABLE_QUERY));
        assert!(draft.text.contains("no corroborating sources"));
    }

    #[test]
    fn stage_transitions() {
        let mut state = PipelineState::new(PipelineInput::classify("https://news.example.com/a"));
        assert_eq!(Stage::ExtractArticle.next(&state), Stage::ExtractKeyword);
        assert_eq!(Stage::ExtractKeyword.next(&state), Stage::SearchInitial);

        state.current_query = QueryState::Active("mayor subway".into());
        assert_eq!(Stage::SearchInitial.next(&state), Stage::RefineKeyword);
        assert_eq!(Stage::RefineKeyword.next(&state), Stage::SearchRefined);
        // No second refinement even with empty evidence
        assert_eq!(Stage::SearchRefined.next(&state), Stage::ComposeDraft);

        state.evidence.push(Evidence::new("t", "s", "https://other.example.com/b"));
        assert_eq!(Stage::SearchInitial.next(&state), Stage::ComposeDraft);
        assert_eq!(Stage::ComposeDraft.next(&state), Stage::Evaluate);
        assert_eq!(Stage::Evaluate.next(&state), Stage::Done);
        assert_eq!(Stage::Done.next(&state), Stage::Done);
    }

    #[test]
    fn unrecoverable_query_skips_to_evaluate() {
        let mut state = PipelineState::new(PipelineInput::classify("https://news.example.com/a"));
        state.current_query = QueryState::Unrecoverable;
        assert_eq!(Stage::SearchInitial.next(&state), Stage::Evaluate);
    }

    #[test]
    fn failure_jumps_to_evaluate() {
        let mut state = PipelineState::new(PipelineInput::classify("https://news.example.com/a"));
        state.failure = Some(StageFailure {
            stage: Stage::ExtractKeyword,
            kind: FailureKind::Unexpected,
            detail: "boom".into(),
        });
        assert_eq!(Stage::ExtractKeyword.next(&state), Stage::Evaluate);
        assert_eq!(Stage::RefineKeyword.next(&state), Stage::Evaluate);
        assert_eq!(Stage::Evaluate.next(&state), Stage::Done);
    }

    #[test]
    fn into_result_always_has_verdict() {
        let state = PipelineState::new(PipelineInput::classify("https://news.example.com/a"));
        let result = state.into_result(RunId::new(), 5);
        assert_eq!(result.verdict.overall_fake_probability(), 1.0);
        assert!(!result.draft_text.is_empty());
        assert_eq!(result.article_title, "");
    }

    #[test]
    fn result_serialization() {
        let mut state = PipelineState::new(PipelineInput::classify("https://news.example.com/a"));
        state.search_queries.push("mayor resign".into());
        state.evidence.push(Evidence::new("t", "s", "https://other.example.com/b"));
        state.verdict = Some(Verdict::from_json(VALID).unwrap());
        state.trail.push(Stage::Done);

        let result = state.into_result(RunId::new(), 12);
        let json = serde_json::to_string(&result).expect("serialize");
        assert!(json.contains(r#""trail":["done"]"#));
        assert!(json.contains(r#""status":"pending""#));

        let parsed: PipelineResult = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.evidence_items.len(), 1);
        assert_eq!(parsed.verdict, result.verdict);
    }

    #[test]
    fn stored_result_with_invalid_verdict_is_rejected() {
        let mut state = PipelineState::new(PipelineInput::classify("https://news.example.com/a"));
        state.verdict = Some(Verdict::from_json(VALID).unwrap());
        let result = state.into_result(RunId::new(), 12);

        let mut value = serde_json::to_value(&result).expect("serialize");
        value["verdict"]["overall_fake_probability"] = serde_json::json!(7.5);
        let err = serde_json::from_value::<PipelineResult>(value.clone()).unwrap_err();
        assert!(err.to_string().contains("overall_fake_probability"));

        value["verdict"]["overall_fake_probability"] = serde_json::json!(0.3);
        value["verdict"]["final_judgment"] = serde_json::json!("  ");
        assert!(serde_json::from_value::<PipelineResult>(value).is_err());
    }
}
