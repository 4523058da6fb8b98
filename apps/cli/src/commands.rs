//! CLI command definitions, routing, and tracing setup.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use newscheck_core::{FactChecker, ProgressReporter};
use newscheck_fetcher::HttpExtractor;
use newscheck_llm::OpenRouterClient;
use newscheck_search::GoogleNewsSearch;
use newscheck_shared::{
    AppConfig, ExtractionStatus, PipelineConfig, PipelineResult, Stage, init_config, load_config,
    validate_api_key,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// newscheck: fact-check news articles against independent coverage.
#[derive(Parser)]
#[command(
    name = "newscheck",
    version,
    about = "Score the credibility of a news article by cross-referencing independent coverage.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fact-check a news article.
    Check {
        /// Article URL (http or https).
        input: String,

        /// Print the full result as JSON.
        #[arg(long)]
        json: bool,

        /// Model to use instead of the configured default.
        #[arg(long)]
        model: Option<String>,

        /// Number of search candidates to gather evidence from.
        #[arg(long)]
        max_candidates: Option<usize>,

        /// Do not retry with a broader query when the first search finds nothing.
        #[arg(long)]
        no_refine: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

/// Flag overrides for `check`.
struct CheckOptions<'a> {
    json: bool,
    model: Option<&'a str>,
    max_candidates: Option<usize>,
    no_refine: bool,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "newscheck=info",
        1 => "newscheck=debug",
        _ => "newscheck=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so `--json` output stays clean.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Check {
            input,
            json,
            model,
            max_candidates,
            no_refine,
        } => {
            let options = CheckOptions {
                json,
                model: model.as_deref(),
                max_candidates,
                no_refine,
            };
            cmd_check(&input, &options).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

async fn cmd_check(input: &str, options: &CheckOptions<'_>) -> Result<()> {
    let url = parse_article_url(input)?;

    // Validate API key before doing anything
    let config = load_config()?;
    let api_key = validate_api_key(&config)?;

    let pipeline_config = pipeline_config(&config, options);
    let model = options.model.unwrap_or(&config.openrouter.default_model);

    let llm = OpenRouterClient::new(
        api_key,
        &config.openrouter.base_url,
        model,
        pipeline_config.llm_timeout,
    )?
    .with_temperature(config.openrouter.temperature);
    let search = GoogleNewsSearch::new(&config.search.base_url, pipeline_config.search_timeout)?;
    let extractor = HttpExtractor::new(pipeline_config.fetch_timeout);

    info!(%url, model, "checking article");

    let checker = FactChecker::new(
        Arc::new(llm),
        Arc::new(search),
        Arc::new(extractor),
        pipeline_config,
    );

    let reporter = CliProgress::new();
    let result = checker.run_with_progress(url.as_str(), &reporter).await;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    Ok(())
}

/// Only http(s) article URLs can be checked.
fn parse_article_url(input: &str) -> Result<Url> {
    let url = Url::parse(input.trim())
        .map_err(|e| eyre!("'{input}' is not a valid URL ({e}); enter an article URL starting with http:// or https://"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(eyre!(
            "unsupported URL scheme '{scheme}': enter an article URL starting with http:// or https://"
        )),
    }
}

fn pipeline_config(config: &AppConfig, options: &CheckOptions<'_>) -> PipelineConfig {
    let mut pipeline = PipelineConfig::from(config);
    if let Some(n) = options.max_candidates {
        pipeline.max_candidates = n;
    }
    if options.no_refine {
        pipeline.refine_on_empty = false;
    }
    pipeline
}

/// Risk label for an overall fake probability.
fn risk_band(probability: f64) -> &'static str {
    if probability >= 0.75 {
        "HIGH"
    } else if probability >= 0.45 {
        "MEDIUM"
    } else {
        "LOW"
    }
}

fn print_result(result: &PipelineResult) {
    let verdict = &result.verdict;

    println!();
    if let ExtractionStatus::Failed { reason } = &result.extraction {
        println!("  Cannot analyze this URL: {reason}");
        println!();
    }
    if !result.article_title.is_empty() {
        println!("  Article:  {}", result.article_title);
    }
    println!(
        "  Risk:     {} ({:.0}% likely fake)",
        risk_band(verdict.overall_fake_probability()),
        verdict.overall_fake_probability() * 100.0
    );
    println!("  Verdict:  {}", verdict.final_judgment());
    println!();

    let dimensions = [
        ("Exaggeration", verdict.exaggeration_score(), verdict.exaggeration_reasoning()),
        ("Lack of sources", verdict.lack_of_sources_score(), verdict.lack_of_sources_reasoning()),
        ("Logical errors", verdict.logical_errors_score(), verdict.logical_errors_reasoning()),
    ];
    for (name, score, reasoning) in dimensions {
        println!("  {name:<16} {score:.2}  {reasoning}");
    }
    println!();

    println!("  Queries:  {}", result.search_queries.join(" -> "));
    if result.evidence_items.is_empty() {
        println!("  Evidence: none found");
    } else {
        println!("  Evidence:");
        for (i, item) in result.evidence_items.iter().enumerate() {
            println!("    [{}] {}", i + 1, item.title());
            println!("        {}", item.source_url());
            println!("        {}", item.summary());
        }
    }
    println!();

    println!("  Fact-check:");
    for line in result.draft_text.lines() {
        println!("    {line}");
    }
    println!();
    println!(
        "  Run {} in {:.1}s",
        result.run_id,
        result.elapsed_ms as f64 / 1000.0
    );
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn stage(&self, stage: Stage) {
        let message = match stage {
            Stage::ExtractArticle => "Fetching article",
            Stage::ExtractKeyword => "Deriving search keywords",
            Stage::SearchInitial => "Searching related coverage",
            Stage::RefineKeyword => "Broadening search query",
            Stage::SearchRefined => "Searching with broader query",
            Stage::ComposeDraft => "Writing fact-check",
            Stage::Evaluate => "Scoring credibility",
            Stage::Done => "Done",
        };
        self.spinner.set_message(message);
    }

    fn evidence(&self, query: &str, found: usize) {
        self.spinner
            .set_message(format!("Found {found} related article(s) for \"{query}\""));
    }

    fn done(&self, _result: &PipelineResult) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
