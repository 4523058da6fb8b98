//! Error types for newscheck.
//!
//! Library crates use [`NewsCheckError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use crate::types::FailureKind;

/// Top-level error type for all newscheck operations.
#[derive(Debug, thiserror::Error)]
pub enum NewsCheckError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to a site, the search provider, or the model API.
    #[error("network error: {0}")]
    Network(String),

    /// HTML, RSS, or response payload parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The primary article could not be extracted (unreachable, or body too short).
    #[error("extraction failed for {url}: {reason}")]
    Extraction { url: String, reason: String },

    /// A single search candidate could not be resolved, fetched, or summarized.
    #[error("search item {url} dropped: {reason}")]
    SearchItem { url: String, reason: String },

    /// Schema-constrained completion was unavailable, malformed, or out of range.
    #[error("structured output error: {0}")]
    StructuredOutput(String),

    /// Language model API error (bad status, empty choices, refused request).
    #[error("language model error: {0}")]
    LanguageModel(String),

    /// An external call exceeded its time budget.
    #[error("timed out after {secs}s: {operation}")]
    Timeout { operation: String, secs: u64 },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad input URL, invalid field values, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, NewsCheckError>;

impl NewsCheckError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an extraction failure for `url`.
    pub fn extraction(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Extraction {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a per-item search failure for `url`.
    pub fn search_item(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SearchItem {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a timeout error for a named operation.
    pub fn timeout(operation: impl Into<String>, secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            secs,
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify this error in the pipeline's failure taxonomy.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Extraction { .. } => FailureKind::Extraction,
            Self::SearchItem { .. } => FailureKind::SearchItem,
            Self::StructuredOutput(_) | Self::Parse { .. } => FailureKind::StructuredOutput,
            Self::Timeout { .. } => FailureKind::Timeout,
            _ => FailureKind::Unexpected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = NewsCheckError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = NewsCheckError::extraction("https://news.example.com/a", "body too short");
        assert!(err.to_string().contains("body too short"));

        let err = NewsCheckError::timeout("search", 10);
        assert_eq!(err.to_string(), "timed out after 10s: search");
    }

    #[test]
    fn failure_kind_mapping() {
        assert_eq!(
            NewsCheckError::StructuredOutput("missing field".into()).failure_kind(),
            FailureKind::StructuredOutput
        );
        assert_eq!(
            NewsCheckError::parse("bad json").failure_kind(),
            FailureKind::StructuredOutput
        );
        assert_eq!(
            NewsCheckError::Network("connection reset".into()).failure_kind(),
            FailureKind::Unexpected
        );
        assert_eq!(
            NewsCheckError::timeout("llm", 60).failure_kind(),
            FailureKind::Timeout
        );
    }
}
