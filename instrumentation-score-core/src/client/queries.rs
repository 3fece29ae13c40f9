//! PromQL text for the collection queries.
//!
//! `filter` is a raw label-matcher fragment such as `env="prod",cluster=~"eu-.*"`
//! and is inserted verbatim; metric and job names are escaped.

/// Escapes a string for use inside a double-quoted PromQL label value.
pub fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Series selector `{__name__="m"[,filter][,job="j"]}`.
pub fn series_selector(metric: &str, filter: Option<&str>, job: Option<&str>) -> String {
    let mut matchers = vec![format!("__name__=\"{}\"", escape_label_value(metric))];
    if let Some(filter) = filter {
        matchers.push(filter.to_string());
    }
    if let Some(job) = job {
        matchers.push(format!("job=\"{}\"", escape_label_value(job)));
    }
    format!("{{{}}}", matchers.join(","))
}

/// Matcher restricting the metric-name catalog.
pub fn catalog_matcher(filter: &str) -> String {
    format!("{{{}}}", filter)
}

/// Instant query returning one series per job exposing `metric`.
pub fn jobs_query(metric: &str, filter: Option<&str>) -> String {
    format!("count by (job) ({})", series_selector(metric, filter, None))
}

/// Instant query returning the series count of `metric` for `job`.
pub fn cardinality_query(metric: &str, job: &str, filter: Option<&str>) -> String {
    format!("count({})", series_selector(metric, filter, Some(job)))
}
