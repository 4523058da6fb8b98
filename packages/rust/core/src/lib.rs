//! Fact-check pipeline orchestration for newscheck.
//!
//! This crate ties article fetching, keyword derivation, evidence gathering,
//! draft composition, and credibility scoring into one workflow driven by
//! [`FactChecker::run_pipeline`].

pub mod draft;
pub mod evaluate;
pub mod evidence;
pub mod fetch;
pub mod keywords;
pub mod pipeline;

#[cfg(test)]
mod testing;

pub use draft::DraftComposer;
pub use evaluate::Evaluator;
pub use evidence::EvidenceGatherer;
pub use fetch::ArticleFetcher;
pub use keywords::{KeywordExtractor, KeywordRefiner};
pub use pipeline::{FactChecker, ProgressReporter, SilentProgress};
