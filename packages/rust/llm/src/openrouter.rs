//! OpenAI-compatible chat completion client (OpenRouter by default).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use newscheck_shared::{NewsCheckError, Result};

use crate::{LanguageModel, Prompt, StructuredSchema};

/// User-Agent string for model API requests.
const USER_AGENT: &str = concat!("newscheck/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    strict: bool,
    schema: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Chat completion client for an OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OpenRouterClient {
    /// Create a client. `base_url` is the API root, e.g. `https://openrouter.ai/api/v1`.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| NewsCheckError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature: 0.0,
        })
    }

    /// Override the sampling temperature (default 0.0).
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, prompt: &Prompt, response_format: Option<ResponseFormat<'_>>) -> Result<String> {
        let start = Instant::now();
        let request = ChatRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: &prompt.system,
                },
                Message {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.temperature,
            response_format,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "model request failed");
                NewsCheckError::Network(format!("model request: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(%status, error = %error_text, "model API error");
            return Err(NewsCheckError::LanguageModel(format!("HTTP {status}: {error_text}")));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| NewsCheckError::LanguageModel(format!("malformed response: {e}")))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| NewsCheckError::LanguageModel("empty response".into()))?;

        debug!(
            model = %self.model,
            chars = content.len(),
            duration_ms = start.elapsed().as_millis(),
            "chat completion"
        );

        Ok(content)
    }
}

#[async_trait]
impl LanguageModel for OpenRouterClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        self.chat(prompt, None).await
    }

    async fn complete_structured(&self, prompt: &Prompt, schema: &StructuredSchema) -> Result<String> {
        let format = ResponseFormat {
            format_type: "json_schema",
            json_schema: JsonSchemaFormat {
                name: schema.name(),
                strict: true,
                schema: schema.schema(),
            },
        };
        self.chat(prompt, Some(format)).await
    }
}
