//! Classified outcomes of a single HTTP exchange.

use std::time::Duration;

use thiserror::Error;

/// `Retry-After` assumed when a 429 response omits the header.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Failure half of a [`RequestOutcome`].
///
/// Every response that is not a 2xx ends up as exactly one of these, which
/// lets callers dispatch policy per variant instead of inspecting raw status
/// codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// HTTP 429. Transient; retried by the client.
    #[error("rate limited, retry after {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// HTTP 401. Recoverable once by refreshing the access token.
    #[error("unauthorized")]
    Unauthorized,

    /// Any other 4xx/5xx. Body is kept for outcome reclassification upstream.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// DNS, connect, reset, or timeout. Transient; retried by the client.
    #[error("network error: {0}")]
    Network(String),

    /// A 2xx response whose body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The request could not be built (bad URL, bad header). Never sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl RequestError {
    /// Whether the client retries this failure on its own.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::Unauthorized => Some(401),
            Self::Http { status, .. } => Some(*status),
            Self::Network(_) | Self::Decode(_) | Self::InvalidRequest(_) => None,
        }
    }

    /// Classify a non-success status code.
    pub fn from_status(status: u16, retry_after: Option<&str>, body: String) -> Self {
        match status {
            429 => Self::RateLimited {
                retry_after: parse_retry_after(retry_after),
            },
            401 => Self::Unauthorized,
            _ => Self::Http { status, body },
        }
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Result of one logical request: the decoded payload or a classified failure.
pub type RequestOutcome<T> = Result<T, RequestError>;

/// Parse a `Retry-After` header given in whole seconds.
///
/// HTTP-date values and garbage fall back to [`DEFAULT_RETRY_AFTER`].
pub fn parse_retry_after(value: Option<&str>) -> Duration {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}
