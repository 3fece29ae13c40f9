//! Report rendering.
//!
//! Every renderer returns the report body as a string; [`write_report`]
//! decides between a file and stdout.

pub mod html;
pub mod json;
pub mod prometheus;
pub mod text;

use instrumentation_score_core::{Result, ScoreError};
use std::path::Path;
use tracing::info;

/// Presentation switches shared by the renderers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReportOptions {
    pub show_costs: bool,
    pub show_failures: bool,
    /// Jobs below this score are listed; 0 disables the listing
    pub min_score: f64,
}

/// Writes `body` to `destination`, or to stdout when there is none.
pub async fn write_report(destination: Option<&Path>, body: &str, label: &str) -> Result<()> {
    match destination {
        Some(path) => {
            tokio::fs::write(path, body).await.map_err(|e| {
                ScoreError::io(format!("Failed to write {} to {}", label, path.display()), e)
            })?;
            info!("Wrote {} to {}", label, path.display());
            println!("{} saved to {}", label, path.display());
        }
        None => print!("{}", body),
    }
    Ok(())
}

pub(crate) fn status_class(score: f64) -> &'static str {
    if score >= 90.0 {
        "status-excellent"
    } else if score >= 75.0 {
        "status-good"
    } else if score >= 50.0 {
        "status-warning"
    } else {
        "status-poor"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_report_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        write_report(Some(&path), "{}\n", "JSON report").await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "{}\n");
    }

    #[tokio::test]
    async fn test_write_report_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.json");

        let err = write_report(Some(&path), "{}", "JSON report")
            .await
            .unwrap_err();
        assert!(matches!(err, ScoreError::Io { .. }));
    }

    #[test]
    fn test_status_class_bands() {
        assert_eq!(status_class(95.0), "status-excellent");
        assert_eq!(status_class(75.0), "status-good");
        assert_eq!(status_class(50.0), "status-warning");
        assert_eq!(status_class(49.9), "status-poor");
    }
}
