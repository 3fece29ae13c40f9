//! Errors returned by metrics backend queries.

use thiserror::Error;

/// Failure of a single backend query after the retry policy has run.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Connection refused, timeout or other transport failure on the last attempt
    #[error("{operation}: request failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success response that is not retried (or retries ran out)
    #[error("{operation}: HTTP {status}: {message}")]
    Status {
        operation: &'static str,
        status: u16,
        message: String,
    },

    /// HTTP 429, surfaced after the cooldown without consuming retries
    #[error("{operation}: rate limited by backend (HTTP 429): {message}")]
    RateLimited {
        operation: &'static str,
        message: String,
    },

    /// The response body was not the expected shape
    #[error("{operation}: malformed response: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },

    /// An endpoint URL could not be built from the configured base URL
    #[error("invalid backend URL: {message}")]
    InvalidUrl { message: String },
}

impl QueryError {
    pub(crate) fn transport(operation: &'static str, source: reqwest::Error) -> Self {
        // reqwest includes the request URL, which may carry query text and
        // credentials; the operation name is enough for diagnostics.
        Self::Transport {
            operation,
            source: source.without_url(),
        }
    }

    pub(crate) fn decode(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            operation,
            message: message.into(),
        }
    }

    /// Name of the backend operation that failed.
    pub fn operation(&self) -> &'static str {
        match self {
            QueryError::Transport { operation, .. }
            | QueryError::Status { operation, .. }
            | QueryError::RateLimited { operation, .. }
            | QueryError::Decode { operation, .. } => operation,
            QueryError::InvalidUrl { .. } => "build_url",
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            QueryError::Status { status, .. } => Some(*status),
            QueryError::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Whether the failure class is retried by the client.
    pub fn is_transient(&self) -> bool {
        match self {
            QueryError::Transport { .. } => true,
            QueryError::Status { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

/// Gateway errors are the only HTTP statuses the client retries.
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 502..=504)
}
