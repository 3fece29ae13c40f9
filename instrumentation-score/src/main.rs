//! Instrumentation score evaluation tool.
//!
//! Scores the per-job record files written by `instrumentation-score-collect`
//! against a YAML rule set and renders text, JSON, HTML or Prometheus reports.
//! The rule set is validated as a whole before any job is evaluated.

use anyhow::{Context, Result};
use clap::Parser;
use instrumentation_score::{Cli, evaluate::run_evaluation};
use instrumentation_score_core::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet).context("Failed to initialize logging")?;

    run_evaluation(&cli)
        .await
        .with_context(|| format!("Evaluation with rules from {} failed", cli.rules.display()))?;
    Ok(())
}
