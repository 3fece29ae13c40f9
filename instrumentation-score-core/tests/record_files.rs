//! Job files written by collection read back as the same records.

#![allow(clippy::unwrap_used)]

use instrumentation_score_core::MetricRecord;
use instrumentation_score_core::records::{
    format_records, list_job_files, parse_records, read_job_file, write_job_files,
};
use std::collections::BTreeMap;

fn records() -> Vec<MetricRecord> {
    vec![
        MetricRecord::new(
            "api",
            "http_requests_total",
            vec!["method".into(), "status".into()],
            1500,
        )
        .with_per_label_cardinality(BTreeMap::from([
            ("method".to_string(), 12),
            ("status".to_string(), 5),
        ])),
        MetricRecord::new("api", "up", vec!["instance".into()], 1),
        MetricRecord::new("kube/system", "up", vec![], 0),
    ]
}

#[tokio::test]
async fn test_file_round_trip_preserves_records() {
    let dir = tempfile::tempdir().unwrap();
    let original = records();

    let summary = write_job_files(dir.path(), &original).await.unwrap();
    assert_eq!(summary.written.len(), 2);
    assert!(summary.skipped.is_empty());

    let files = list_job_files(dir.path()).await.unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["api.txt", "kube_system.txt"]);

    let mut read_back = Vec::new();
    for file in &files {
        read_back.extend(read_job_file(file).await.unwrap());
    }
    read_back.sort_by(|a, b| (&a.job, &a.metric_name).cmp(&(&b.job, &b.metric_name)));
    assert_eq!(read_back, original);
}

#[test]
fn test_reserialized_text_is_stable() {
    let text = format_records(&records());
    let parsed = parse_records(&text, "memory");
    assert_eq!(format_records(&parsed), text);
}
