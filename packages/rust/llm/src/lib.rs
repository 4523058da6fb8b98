//! Language Model Service.
//!
//! [`LanguageModel`] is the seam the pipeline talks to a model through.
//! [`OpenRouterClient`] implements it against any OpenAI-compatible
//! `chat/completions` endpoint (OpenRouter by default).

mod openrouter;
mod schema;

use async_trait::async_trait;
use newscheck_shared::{NewsCheckError, Result};

pub use openrouter::OpenRouterClient;
pub use schema::{StructuredSchema, strip_code_fence};

/// A system + user message pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// A text-completion backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Free-text completion.
    async fn complete(&self, prompt: &Prompt) -> Result<String>;

    /// Completion constrained to `schema`. Returns the raw response text,
    /// which may still be wrapped in a Markdown code fence.
    ///
    /// Backends without schema support keep the default, which reports a
    /// structured output failure.
    async fn complete_structured(&self, prompt: &Prompt, schema: &StructuredSchema) -> Result<String> {
        let _ = prompt;
        Err(NewsCheckError::StructuredOutput(format!(
            "structured completion unavailable for schema {}",
            schema.name()
        )))
    }
}
