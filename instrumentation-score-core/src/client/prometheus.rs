//! HTTP implementation of [`MetricsBackend`] for the Prometheus query API.

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};
use url::Url;

use super::error::is_retryable_status;
use super::{ClientConfig, MetricsBackend, QueryError, queries};
use crate::error::{ScoreError, redact_url};

const MAX_ERROR_BODY_CHARS: usize = 512;

/// Prometheus HTTP API client with linear-backoff retries.
///
/// Also understands the Grafana Mimir cardinality API for per-label value
/// counts.
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    http: reqwest::Client,
    base_url: String,
    config: ClientConfig,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    data: T,
}

#[derive(Debug, Default, Deserialize)]
struct VectorData {
    #[serde(default)]
    result: Vec<VectorSample>,
}

#[derive(Debug, Deserialize)]
struct VectorSample {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    #[serde(default)]
    value: Option<(f64, String)>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LabelValuesResponse {
    #[serde(default)]
    labels: Vec<LabelValuesEntry>,
}

#[derive(Debug, Deserialize)]
struct LabelValuesEntry {
    label_name: String,
    label_values_count: u64,
}

impl PrometheusClient {
    /// Creates a client for the configured backend.
    ///
    /// # Errors
    /// Returns a configuration error if the base URL is not an absolute
    /// http(s) URL or the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> crate::Result<Self> {
        let parsed = Url::parse(&config.base_url).map_err(|e| {
            ScoreError::configuration(format!(
                "Invalid backend URL '{}': {}",
                redact_url(&config.base_url),
                e
            ))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScoreError::configuration(format!(
                "Unsupported backend URL scheme '{}', expected http or https",
                parsed.scheme()
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                ScoreError::configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, QueryError> {
        let address = format!("{}{}", self.base_url, path);
        // parse_with_params leaves a dangling '?' when there are no params
        let parsed = if params.is_empty() {
            Url::parse(&address)
        } else {
            Url::parse_with_params(&address, params)
        };
        parsed.map_err(|e| QueryError::InvalidUrl {
            message: e.to_string(),
        })
    }

    /// Sends a GET request, retrying transport failures and gateway errors.
    ///
    /// Any response that is not retried is returned as-is, including non-2xx.
    async fn send_with_retry(
        &self,
        operation: &'static str,
        url: &Url,
    ) -> Result<reqwest::Response, QueryError> {
        let mut attempt: u32 = 0;
        loop {
            if attempt > 0 {
                let delay = self.config.backoff_unit * attempt;
                debug!(operation, attempt, ?delay, "Backing off before retry");
                tokio::time::sleep(delay).await;
            }

            let mut request = self.http.get(url.clone());
            if let Some(credentials) = &self.config.credentials {
                request = request.basic_auth(&credentials.username, Some(&credentials.password));
            }

            match request.send().await {
                Err(e) => {
                    if attempt < self.config.retry_count {
                        warn!(operation, attempt, "Request failed, retrying: {}", e.without_url());
                        attempt += 1;
                        continue;
                    }
                    return Err(QueryError::transport(operation, e));
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    if is_retryable_status(status) && attempt < self.config.retry_count {
                        warn!(operation, attempt, status, "Backend unavailable, retrying");
                        attempt += 1;
                        continue;
                    }
                    return Ok(response);
                }
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: Url,
    ) -> Result<T, QueryError> {
        let response = self.send_with_retry(operation, &url).await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| QueryError::transport(operation, e))?;

        if !status.is_success() {
            let message = backend_error_message(&body);
            if status.as_u16() == 429 {
                tokio::time::sleep(self.config.rate_limit_cooldown).await;
                return Err(QueryError::RateLimited { operation, message });
            }
            return Err(QueryError::Status {
                operation,
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| QueryError::decode(operation, e.to_string()))
    }

    async fn instant_query(
        &self,
        operation: &'static str,
        query: &str,
        at: Option<i64>,
    ) -> Result<VectorData, QueryError> {
        let time = at.map(|t| t.to_string());
        let mut params = vec![("query", query)];
        if let Some(time) = time.as_deref() {
            params.push(("time", time));
        }
        let url = self.endpoint("/api/v1/query", &params)?;
        let response: ApiResponse<VectorData> = self.get_json(operation, url).await?;
        Ok(response.data)
    }

    async fn labels_via_query(&self, selector: &str) -> Result<Vec<String>, QueryError> {
        let data = self.instant_query("fetch_labels", selector, None).await?;
        let labels: BTreeSet<String> = data
            .result
            .into_iter()
            .flat_map(|sample| sample.metric.into_keys())
            .filter(|key| key != "__name__")
            .collect();
        Ok(labels.into_iter().collect())
    }

    async fn labels_via_api(&self, selector: &str) -> Result<Vec<String>, QueryError> {
        let url = self.endpoint("/api/v1/labels", &[("match[]", selector)])?;
        let response: ApiResponse<Vec<String>> = self.get_json("fetch_labels", url).await?;
        let labels: BTreeSet<String> = response
            .data
            .into_iter()
            .filter(|label| label != "__name__")
            .collect();
        Ok(labels.into_iter().collect())
    }
}

#[async_trait]
impl MetricsBackend for PrometheusClient {
    async fn metric_names(&self, filter: Option<&str>) -> Result<Vec<String>, QueryError> {
        let url = match filter {
            Some(filter) => self.endpoint(
                "/api/v1/label/__name__/values",
                &[("match[]", queries::catalog_matcher(filter).as_str())],
            )?,
            None => self.endpoint("/api/v1/label/__name__/values", &[])?,
        };
        let response: ApiResponse<Vec<String>> = self.get_json("fetch_metric_names", url).await?;
        Ok(response.data)
    }

    async fn jobs_for_metric(
        &self,
        metric: &str,
        filter: Option<&str>,
        at: i64,
    ) -> Result<Vec<String>, QueryError> {
        let query = queries::jobs_query(metric, filter);
        let data = self.instant_query("fetch_jobs", &query, Some(at)).await?;
        Ok(data
            .result
            .into_iter()
            .filter_map(|mut sample| sample.metric.remove("job"))
            .collect())
    }

    async fn cardinality(
        &self,
        metric: &str,
        job: &str,
        filter: Option<&str>,
        at: i64,
    ) -> Result<u64, QueryError> {
        let query = queries::cardinality_query(metric, job, filter);
        let data = self
            .instant_query("fetch_cardinality", &query, Some(at))
            .await?;

        // No series at the evaluation time means zero cardinality.
        let Some((_, raw)) = data.result.into_iter().find_map(|sample| sample.value) else {
            return Ok(0);
        };
        parse_count(&raw).ok_or_else(|| {
            QueryError::decode(
                "fetch_cardinality",
                format!("non-numeric sample value '{}'", raw),
            )
        })
    }

    async fn label_names(
        &self,
        metric: &str,
        job: &str,
        filter: Option<&str>,
    ) -> Result<Vec<String>, QueryError> {
        let selector = queries::series_selector(metric, filter, Some(job));
        match self.labels_via_query(&selector).await {
            Ok(labels) if !labels.is_empty() => return Ok(labels),
            Ok(_) => debug!(metric, job, "Series query returned no labels, using labels API"),
            Err(e) => debug!(metric, job, "Series query for labels failed ({}), using labels API", e),
        }
        self.labels_via_api(&selector).await
    }

    async fn label_cardinality(
        &self,
        metric: &str,
        job: &str,
        labels: &[String],
        filter: Option<&str>,
    ) -> Result<BTreeMap<String, u64>, QueryError> {
        let selector = queries::series_selector(metric, filter, Some(job));
        let mut params = vec![("selector", selector.as_str())];
        params.extend(labels.iter().map(|label| ("label_names[]", label.as_str())));
        let url = self.endpoint("/api/v1/cardinality/label_values", &params)?;

        let response: LabelValuesResponse =
            self.get_json("fetch_label_cardinality", url).await?;
        Ok(response
            .labels
            .into_iter()
            .map(|entry| (entry.label_name, entry.label_values_count))
            .collect())
    }
}

/// Parses a sample value as a series count.
///
/// Prometheus encodes sample values as strings of floats; integral values are
/// taken as-is and fractional ones are rounded.
pub(crate) fn parse_count(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    raw.parse::<u64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value >= 0.0)
            .map(|value| value.round() as u64)
    })
}

/// Extracts `error` from a Prometheus error body, falling back to the raw text.
fn backend_error_message(body: &str) -> String {
    if let Ok(ErrorBody {
        error: Some(message),
    }) = serde_json::from_str::<ErrorBody>(body)
        && !message.is_empty()
    {
        return message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("1500"), Some(1500));
        assert_eq!(parse_count("12.0"), Some(12));
        assert_eq!(parse_count("2.6"), Some(3));
        assert_eq!(parse_count("-1"), None);
        assert_eq!(parse_count("NaN"), None);
        assert_eq!(parse_count("abc"), None);
    }

    #[test]
    fn test_backend_error_message() {
        assert_eq!(
            backend_error_message(r#"{"status":"error","errorType":"bad_data","error":"parse error at char 5"}"#),
            "parse error at char 5"
        );
        assert_eq!(backend_error_message("gateway down\n"), "gateway down");
        assert_eq!(backend_error_message(""), "empty response body");
        assert_eq!(backend_error_message(&"x".repeat(2000)).len(), MAX_ERROR_BODY_CHARS);
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let result = PrometheusClient::new(ClientConfig::new("ftp://metrics.example.com"));
        assert!(matches!(result, Err(ScoreError::Configuration { .. })));

        let result = PrometheusClient::new(ClientConfig::new("not a url"));
        assert!(matches!(result, Err(ScoreError::Configuration { .. })));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = PrometheusClient::new(ClientConfig::new("http://localhost:9090/prom/")).unwrap();
        let url = client.endpoint("/api/v1/labels", &[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9090/prom/api/v1/labels");
    }
}
