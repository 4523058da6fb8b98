//! In-memory doubles of the three service traits, for pipeline tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use newscheck_fetcher::{ContentExtractor, ExtractedArticle, ExtractionSession};
use newscheck_llm::{LanguageModel, Prompt, StructuredSchema};
use newscheck_search::{SearchHit, SearchProvider, SearchRequest};
use newscheck_shared::{NewsCheckError, Result};

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Serves canned pages by URL and counts live sessions.
#[derive(Default)]
pub struct MockExtractor {
    pages: HashMap<String, (String, String)>,
    delays: HashMap<String, Duration>,
    opened: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, title: &str, body: &str) -> Self {
        self.pages.insert(url.into(), (title.into(), body.into()));
        self
    }

    pub fn slow_page(mut self, url: &str, title: &str, body: &str, delay: Duration) -> Self {
        self.delays.insert(url.into(), delay);
        self.page(url, title, body)
    }

    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn sessions_live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentExtractor for MockExtractor {
    async fn open_session(&self) -> Result<Box<dyn ExtractionSession>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            pages: self.pages.clone(),
            delays: self.delays.clone(),
            live: Arc::clone(&self.live),
        }))
    }
}

struct MockSession {
    pages: HashMap<String, (String, String)>,
    delays: HashMap<String, Duration>,
    live: Arc<AtomicUsize>,
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ExtractionSession for MockSession {
    async fn resolve(&self, url: &Url) -> Result<Url> {
        if url.path().contains("undecodable") {
            return Err(NewsCheckError::search_item(url.as_str(), "undecodable news article id"));
        }
        Ok(url.clone())
    }

    async fn extract(&self, url: &Url, _raw_html: Option<&str>) -> Result<ExtractedArticle> {
        if let Some(delay) = self.delays.get(url.as_str()) {
            tokio::time::sleep(*delay).await;
        }
        let (title, body) = self
            .pages
            .get(url.as_str())
            .ok_or_else(|| NewsCheckError::extraction(url.as_str(), "HTTP 404 Not Found"))?;
        Ok(ExtractedArticle {
            title: title.clone(),
            body: body.clone(),
            url: url.to_string(),
            adapter: "mock".into(),
        })
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Replays queued responses in call order; once the queue is empty every
/// search returns nothing. Records each query.
#[derive(Default)]
pub struct MockSearch {
    responses: Mutex<VecDeque<Result<Vec<SearchHit>>>>,
    queries: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(self, urls: &[&str]) -> Self {
        let hits = urls
            .iter()
            .map(|u| SearchHit {
                url: Url::parse(u).unwrap(),
                title: None,
            })
            .collect();
        self.responses.lock().unwrap().push_back(Ok(hits));
        self
    }

    pub fn failure(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(NewsCheckError::Network(message.into())));
        self
    }

    /// Every search sleeps for `delay` before answering.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        self.queries.lock().unwrap().push(request.query.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(mut hits)) => {
                hits.truncate(request.max_results);
                Ok(hits)
            }
            Some(Err(e)) => Err(e),
            None => Ok(Vec::new()),
        }
    }
}

// ---------------------------------------------------------------------------
// Language model
// ---------------------------------------------------------------------------

type Reply = Box<dyn Fn(&Prompt) -> Result<String> + Send + Sync>;

/// Answers free-text prompts with a closure and structured prompts with a
/// fixed reply. Records every prompt it sees.
pub struct MockModel {
    complete: Reply,
    structured: Option<String>,
    prompts: Mutex<Vec<Prompt>>,
}

impl MockModel {
    pub fn new(complete: impl Fn(&Prompt) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            complete: Box::new(complete),
            structured: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A model whose free-text calls always fail.
    pub fn failing() -> Self {
        Self::new(|_| Err(NewsCheckError::LanguageModel("HTTP 503: upstream unavailable".into())))
    }

    pub fn structured(mut self, reply: &str) -> Self {
        self.structured = Some(reply.into());
        self
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.clone());
        (self.complete)(prompt)
    }

    async fn complete_structured(&self, prompt: &Prompt, schema: &StructuredSchema) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.structured.clone().ok_or_else(|| {
            NewsCheckError::StructuredOutput(format!(
                "structured completion unavailable for schema {}",
                schema.name()
            ))
        })
    }
}

/// Valid verdict JSON used across tests.
pub const VERDICT_JSON: &str = r#"{
    "exaggeration_score": 0.2,
    "exaggeration_reasoning": "The headline matches the coverage.",
    "lack_of_sources_score": 0.1,
    "lack_of_sources_reasoning": "Two independent outlets report the same facts.",
    "logical_errors_score": 0.0,
    "logical_errors_reasoning": "No fallacies found.",
    "overall_fake_probability": 0.15,
    "final_judgment": "The article is likely accurate."
}"#;
