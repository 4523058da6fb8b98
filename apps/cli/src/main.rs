//! newscheck CLI: credibility fact-checks for news articles.
//!
//! Fetches an article, cross-references independent coverage, and prints a
//! scored credibility verdict.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
