//! Shared types, error model, and configuration for newscheck.
//!
//! This crate is the foundation depended on by all other newscheck crates.
//! It provides:
//! - [`NewsCheckError`]: the unified error type
//! - Domain types ([`PipelineState`], [`Evidence`], [`Verdict`], [`PipelineResult`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, OpenRouterConfig, PipelineConfig, SearchConfig, TimeoutsConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{NewsCheckError, Result};
pub use types::{
    Article, Draft, DraftKind, Evidence, EvidenceStatus, ExtractionStatus, FailureKind, InputKind,
    PipelineInput, PipelineResult, PipelineState, QueryState, RunId, Stage, StageFailure,
    UNRECOVERABLE_QUERY, UNSUMMARIZABLE_SUMMARY, Verdict,
};
