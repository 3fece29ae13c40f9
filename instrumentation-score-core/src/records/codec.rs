//! Pipe-delimited text encoding of metric records.
//!
//! ```text
//! JOB|METRIC_NAME|LABELS|CARDINALITY|LABEL_CARDINALITY
//! api-service|http_requests_total|method,status|1500|method:12,status:5
//! ```
//!
//! `LABELS` and `LABEL_CARDINALITY` are comma-joined without escaping. The last
//! column may be empty or missing.

use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::MetricRecord;

/// Header line written at the top of every job file.
pub const RECORD_HEADER: &str = "JOB|METRIC_NAME|LABELS|CARDINALITY|LABEL_CARDINALITY";

/// Why a record line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordParseError {
    #[error("expected 4 or 5 columns, found {0}")]
    ColumnCount(usize),
    #[error("invalid cardinality '{0}'")]
    InvalidCardinality(String),
    #[error("missing job or metric name")]
    MissingIdentity,
}

fn is_header(line: &str) -> bool {
    line.starts_with("JOB|METRIC_NAME|")
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty())
}

fn parse_label_cardinality(value: &str) -> BTreeMap<String, u64> {
    split_list(value)
        .filter_map(|entry| {
            let parsed = entry.split_once(':').and_then(|(name, count)| {
                let name = name.trim();
                let count = count.trim().parse::<u64>().ok()?;
                (!name.is_empty()).then(|| (name.to_string(), count))
            });
            if parsed.is_none() {
                debug!("Skipping malformed label cardinality entry '{}'", entry);
            }
            parsed
        })
        .collect()
}

/// Parses one record line.
pub fn parse_record(line: &str) -> Result<MetricRecord, RecordParseError> {
    let columns: Vec<&str> = line.split('|').map(str::trim).collect();
    if !(4..=5).contains(&columns.len()) {
        return Err(RecordParseError::ColumnCount(columns.len()));
    }

    let (job, metric_name) = (columns[0], columns[1]);
    if job.is_empty() || metric_name.is_empty() {
        return Err(RecordParseError::MissingIdentity);
    }

    let cardinality = columns[3]
        .parse::<u64>()
        .map_err(|_| RecordParseError::InvalidCardinality(columns[3].to_string()))?;

    let labels = split_list(columns[2]).map(str::to_string).collect();
    let record = MetricRecord::new(job, metric_name, labels, cardinality);

    Ok(match columns.get(4) {
        Some(value) if !value.is_empty() => {
            record.with_per_label_cardinality(parse_label_cardinality(value))
        }
        _ => record,
    })
}

/// Parses a job file body.
///
/// The header, blank lines and `#` comments are skipped. Malformed lines are
/// dropped with a warning naming the line number; `source` labels the warning.
pub fn parse_records(text: &str, source: &str) -> Vec<MetricRecord> {
    let mut records = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || is_header(line) {
            continue;
        }
        match parse_record(line) {
            Ok(record) => records.push(record),
            Err(e) => warn!("{}:{}: dropping record line: {}", source, index + 1, e),
        }
    }
    records
}

/// Formats per-label cardinality, following the record's label order.
///
/// Keys absent from `labels` follow in sorted order.
fn format_label_cardinality(record: &MetricRecord) -> String {
    let Some(values) = &record.per_label_cardinality else {
        return String::new();
    };

    let mut parts = Vec::with_capacity(values.len());
    for label in &record.labels {
        if let Some(count) = values.get(label) {
            parts.push(format!("{}:{}", label, count));
        }
    }
    for (label, count) in values {
        if !record.labels.contains(label) {
            parts.push(format!("{}:{}", label, count));
        }
    }
    parts.join(",")
}

/// Formats one record line without a trailing newline.
pub fn format_record(record: &MetricRecord) -> String {
    format!(
        "{}|{}|{}|{}|{}",
        record.job,
        record.metric_name,
        record.labels.join(","),
        record.cardinality,
        format_label_cardinality(record)
    )
}

/// Formats a complete job file body including the header.
pub fn format_records<'a>(records: impl IntoIterator<Item = &'a MetricRecord>) -> String {
    let mut body = String::from(RECORD_HEADER);
    body.push('\n');
    for record in records {
        body.push_str(&format_record(record));
        body.push('\n');
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_record() {
        let record =
            parse_record("api-service|http_requests_total|method,status|1500|method:12,status:5")
                .unwrap();
        assert_eq!(record.job, "api-service");
        assert_eq!(record.metric_name, "http_requests_total");
        assert_eq!(record.labels, vec!["method", "status"]);
        assert_eq!(record.cardinality, 1500);
        let per_label = record.per_label_cardinality.unwrap();
        assert_eq!(per_label.get("method"), Some(&12));
        assert_eq!(per_label.get("status"), Some(&5));
    }

    #[test]
    fn test_parse_four_columns_and_empty_labels() {
        let record = parse_record("api|up||1").unwrap();
        assert!(record.labels.is_empty());
        assert!(record.per_label_cardinality.is_none());

        let record = parse_record("api|up|instance|1|").unwrap();
        assert_eq!(record.labels, vec!["instance"]);
        assert!(record.per_label_cardinality.is_none());
    }

    #[test]
    fn test_parse_rejects_bad_lines() {
        assert_eq!(
            parse_record("api|up|1"),
            Err(RecordParseError::ColumnCount(3))
        );
        assert_eq!(
            parse_record("api|up|a|b|c|d"),
            Err(RecordParseError::ColumnCount(6))
        );
        assert_eq!(
            parse_record("api|up|method|lots"),
            Err(RecordParseError::InvalidCardinality("lots".to_string()))
        );
        assert_eq!(
            parse_record("api|up|method|-3"),
            Err(RecordParseError::InvalidCardinality("-3".to_string()))
        );
        assert_eq!(
            parse_record("|up|method|3"),
            Err(RecordParseError::MissingIdentity)
        );
    }

    #[test]
    fn test_malformed_label_cardinality_entries_are_skipped() {
        let record = parse_record("api|m|a,b,c|10|a:1,b:x,c,:4").unwrap();
        let per_label = record.per_label_cardinality.unwrap();
        assert_eq!(per_label.len(), 1);
        assert_eq!(per_label.get("a"), Some(&1));

        let record = parse_record("api|m|a|10|garbage").unwrap();
        assert!(record.per_label_cardinality.is_none());
    }

    #[test]
    fn test_parse_records_skips_header_comments_and_bad_lines() {
        let text = "\
JOB|METRIC_NAME|LABELS|CARDINALITY|LABEL_CARDINALITY
# collected by hand

api|up|instance|2|
api|broken
api|http_requests_total|method|40|
";
        let records = parse_records(text, "api.txt");
        let names: Vec<_> = records.iter().map(|r| r.metric_name.as_str()).collect();
        assert_eq!(names, vec!["up", "http_requests_total"]);
    }

    #[test]
    fn test_format_record_orders_label_cardinality_by_labels() {
        let mut values = BTreeMap::new();
        values.insert("status".to_string(), 5);
        values.insert("method".to_string(), 12);
        values.insert("extra".to_string(), 1);
        let record = MetricRecord::new(
            "api-service",
            "http_requests_total",
            vec!["status".to_string(), "method".to_string()],
            1500,
        )
        .with_per_label_cardinality(values);

        assert_eq!(
            format_record(&record),
            "api-service|http_requests_total|status,method|1500|status:5,method:12,extra:1"
        );
    }

    #[test]
    fn test_format_records_round_trip() {
        let records = vec![
            MetricRecord::new("api", "up", vec![], 1),
            MetricRecord::new(
                "api",
                "http_requests_total",
                vec!["method".to_string(), "status".to_string()],
                1500,
            )
            .with_per_label_cardinality(
                [("method".to_string(), 12), ("status".to_string(), 5)]
                    .into_iter()
                    .collect(),
            ),
        ];

        let text = format_records(&records);
        assert!(text.starts_with(RECORD_HEADER));
        assert_eq!(parse_records(&text, "test"), records);
    }
}
