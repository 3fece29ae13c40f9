//! Backend connection and retry configuration.

use std::fmt;
use std::time::Duration;

/// Basic-auth credentials for the metrics backend.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Parses a `user:password` login string.
    ///
    /// Returns `None` when the string has no `:` separator.
    pub fn parse(login: &str) -> Option<Self> {
        let (username, password) = login.split_once(':')?;
        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"****")
            .finish()
    }
}

/// Configuration for [`super::PrometheusClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the Prometheus-compatible API, without `/api/v1`
    pub base_url: String,
    pub credentials: Option<Credentials>,
    /// Attempts made in addition to the first one
    pub retry_count: u32,
    pub request_timeout: Duration,
    /// Backoff before retry `n` is `n * backoff_unit`
    pub backoff_unit: Duration,
    /// Sleep applied before surfacing an HTTP 429
    pub rate_limit_cooldown: Duration,
}

impl ClientConfig {
    pub const DEFAULT_RETRY_COUNT: u32 = 2;
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);
    pub const DEFAULT_RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(2);

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            credentials: None,
            retry_count: Self::DEFAULT_RETRY_COUNT,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            backoff_unit: Self::DEFAULT_BACKOFF_UNIT,
            rate_limit_cooldown: Self::DEFAULT_RATE_LIMIT_COOLDOWN,
        }
    }

    /// Builder method to set credentials from a `user:password` string.
    ///
    /// An empty login disables authentication; a login without `:` is
    /// ignored with a warning.
    pub fn with_login(mut self, login: &str) -> Self {
        if login.is_empty() {
            self.credentials = None;
            return self;
        }
        self.credentials = Credentials::parse(login);
        if self.credentials.is_none() {
            tracing::warn!("Login is not in user:password form, requests will be unauthenticated");
        }
        self
    }

    /// Builder method to set the number of retries after the first attempt.
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Builder method to set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        if timeout.is_zero() {
            tracing::warn!(
                "request timeout of 0 replaced with default {:?}",
                Self::DEFAULT_REQUEST_TIMEOUT
            );
            self.request_timeout = Self::DEFAULT_REQUEST_TIMEOUT;
        } else {
            self.request_timeout = timeout;
        }
        self
    }

    /// Builder method to set the linear backoff unit.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Builder method to set the cooldown applied to HTTP 429 responses.
    pub fn with_rate_limit_cooldown(mut self, cooldown: Duration) -> Self {
        self.rate_limit_cooldown = cooldown;
        self
    }
}
