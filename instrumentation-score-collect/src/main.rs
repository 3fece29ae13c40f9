//! Metric inventory collection tool.
//!
//! This binary queries a Prometheus-compatible backend for every metric and
//! job it exposes and writes one record file per job, ready for evaluation
//! by `instrumentation-score`.
//!
//! # Guarantees
//! - Read-only access to the backend query API
//! - Credentials are never logged
//! - Ctrl-C stops new queries, writes partial results and exits non-zero

use clap::Parser;
use instrumentation_score_collect::{
    Cli,
    collect::{print_summary, run_collection},
};
use instrumentation_score_core::{Result, ScoreError, logging::init_logging};
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping collection");
            on_interrupt.cancel();
        }
    });

    let report = run_collection(&cli, &cancel).await?;
    print_summary(&report);

    if report.cancelled {
        return Err(ScoreError::cancelled(format!(
            "collection interrupted, partial results in {}",
            report.layout.job_dir.display()
        )));
    }
    Ok(())
}
