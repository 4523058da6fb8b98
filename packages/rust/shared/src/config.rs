//! Application configuration for newscheck.
//!
//! User config lives at `~/.newscheck/newscheck.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{NewsCheckError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "newscheck.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".newscheck";

// ---------------------------------------------------------------------------
// Config structs (matching newscheck.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pipeline policy defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// OpenRouter (or any OpenAI-compatible endpoint) settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Per-call time budgets.
    #[serde(default)]
    pub timeouts: TimeoutsConfig,

    /// Search provider settings.
    #[serde(default)]
    pub search: SearchConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Search language (`hl`).
    #[serde(default = "default_language")]
    pub language: String,

    /// Search country (`gl`).
    #[serde(default = "default_country")]
    pub country: String,

    /// Maximum search candidates per query.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// Concurrent fetch/summarize workers per gather.
    #[serde(default = "default_gather_concurrency")]
    pub gather_concurrency: usize,

    /// Broaden the query once when the first search finds nothing.
    #[serde(default = "default_true")]
    pub refine_on_empty: bool,

    /// Primary article bodies shorter than this (in chars) are unusable.
    #[serde(default = "default_min_article_chars")]
    pub min_article_chars: usize,

    /// Candidate bodies must be longer than this (in chars) to be summarized.
    #[serde(default = "default_min_summary_chars")]
    pub min_summary_chars: usize,

    /// Whole-run deadline in seconds; 0 disables it.
    #[serde(default)]
    pub run_deadline_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            country: default_country(),
            max_candidates: default_max_candidates(),
            gather_concurrency: default_gather_concurrency(),
            refine_on_empty: true,
            min_article_chars: default_min_article_chars(),
            min_summary_chars: default_min_summary_chars(),
            run_deadline_secs: 0,
        }
    }
}

fn default_language() -> String {
    "ko".into()
}
fn default_country() -> String {
    "KR".into()
}
fn default_max_candidates() -> usize {
    3
}
fn default_gather_concurrency() -> usize {
    3
}
fn default_true() -> bool {
    true
}
fn default_min_article_chars() -> usize {
    30
}
fn default_min_summary_chars() -> usize {
    50
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for every completion.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// OpenAI-compatible API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f32,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            default_model: default_model(),
            base_url: default_base_url(),
            temperature: 0.0,
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "google/gemini-2.5-flash".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}

/// `[timeouts]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    /// Page fetch + extraction.
    #[serde(default = "default_fetch_secs")]
    pub fetch_secs: u64,

    /// Search provider query.
    #[serde(default = "default_search_secs")]
    pub search_secs: u64,

    /// One language model completion.
    #[serde(default = "default_llm_secs")]
    pub llm_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            fetch_secs: default_fetch_secs(),
            search_secs: default_search_secs(),
            llm_secs: default_llm_secs(),
        }
    }
}

fn default_fetch_secs() -> u64 {
    10
}
fn default_search_secs() -> u64 {
    10
}
fn default_llm_secs() -> u64 {
    60
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Google News origin.
    #[serde(default = "default_search_base_url")]
    pub base_url: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
        }
    }
}

fn default_search_base_url() -> String {
    "https://news.google.com".into()
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline policy: merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub language: String,
    pub country: String,
    pub max_candidates: usize,
    pub gather_concurrency: usize,
    pub refine_on_empty: bool,
    pub min_article_chars: usize,
    pub min_summary_chars: usize,
    pub fetch_timeout: Duration,
    pub search_timeout: Duration,
    pub llm_timeout: Duration,
    /// `None` means no whole-run deadline.
    pub run_deadline: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        let d = &config.defaults;
        Self {
            language: d.language.clone(),
            country: d.country.clone(),
            max_candidates: d.max_candidates,
            gather_concurrency: d.gather_concurrency.max(1),
            refine_on_empty: d.refine_on_empty,
            min_article_chars: d.min_article_chars,
            min_summary_chars: d.min_summary_chars,
            fetch_timeout: Duration::from_secs(config.timeouts.fetch_secs),
            search_timeout: Duration::from_secs(config.timeouts.search_secs),
            llm_timeout: Duration::from_secs(config.timeouts.llm_secs),
            run_deadline: (d.run_deadline_secs > 0)
                .then(|| Duration::from_secs(d.run_deadline_secs)),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.newscheck/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| NewsCheckError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.newscheck/newscheck.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| NewsCheckError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| NewsCheckError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| NewsCheckError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| NewsCheckError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| NewsCheckError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the API key env var is set and non-empty, returning the key.
pub fn validate_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.openrouter.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(NewsCheckError::config(format!(
            "language model API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://openrouter.ai/keys"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("max_candidates"));
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
        assert!(toml_str.contains("news.google.com"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.max_candidates, 3);
        assert_eq!(parsed.defaults.min_article_chars, 30);
        assert_eq!(parsed.openrouter.api_key_env, "OPENROUTER_API_KEY");
        assert_eq!(parsed.timeouts.fetch_secs, 10);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
language = "en"
country = "US"
refine_on_empty = false

[timeouts]
llm_secs = 30
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.language, "en");
        assert!(!config.defaults.refine_on_empty);
        assert_eq!(config.defaults.max_candidates, 3);
        assert_eq!(config.timeouts.llm_secs, 30);
        assert_eq!(config.timeouts.search_secs, 10);
        assert_eq!(config.openrouter.default_model, "google/gemini-2.5-flash");
    }

    #[test]
    fn pipeline_config_from_app_config() {
        let mut app = AppConfig::default();
        let pipeline = PipelineConfig::from(&app);
        assert_eq!(pipeline.max_candidates, 3);
        assert_eq!(pipeline.gather_concurrency, 3);
        assert_eq!(pipeline.fetch_timeout, Duration::from_secs(10));
        assert!(pipeline.run_deadline.is_none());

        app.defaults.run_deadline_secs = 90;
        app.defaults.gather_concurrency = 0;
        let pipeline = PipelineConfig::from(&app);
        assert_eq!(pipeline.run_deadline, Some(Duration::from_secs(90)));
        assert_eq!(pipeline.gather_concurrency, 1);
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.openrouter.api_key_env = "NC_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
