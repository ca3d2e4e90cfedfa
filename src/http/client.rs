//! Rate-limited HTTP client with typed failure classification and retries.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use super::outcome::{RequestError, RequestOutcome};
use super::rate_limiter::RateLimiter;

pub const USER_AGENT: &str = "Mozilla/5.0 (Compatible; AutoApply/0.3)";

/// Per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Exponential backoff for transient failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub base_delay: Duration,
    /// Ceiling for any single delay, including server-provided hints.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (1 = the wait after the first attempt).
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exp)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Wait before retrying after `err`. Rate limits honour `Retry-After`
    /// when it exceeds the backoff, still bounded by `max_delay`.
    pub fn delay_for(&self, err: &RequestError, retry: u32) -> Duration {
        let backoff = self.backoff(retry);
        match err {
            RequestError::RateLimited { retry_after } => {
                backoff.max(*retry_after).min(self.max_delay)
            }
            _ => backoff,
        }
    }
}

/// Request body encodings the platform accepts.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

/// One logical request. Relative paths resolve against the client's base URL;
/// absolute `http(s)://` URLs are used as-is.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(fields));
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {}", token))
    }
}

/// Successful (2xx) response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> RequestOutcome<T> {
        serde_json::from_str(&self.body).map_err(|e| RequestError::Decode(e.to_string()))
    }
}

/// Client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

/// HTTP client that gates every attempt on the shared [`RateLimiter`],
/// classifies responses into [`RequestError`] variants, and retries
/// rate-limit and network failures with exponential backoff.
///
/// Unauthorized and other HTTP errors are returned immediately.
#[derive(Debug, Clone)]
pub struct ResilientHttpClient {
    client: Client,
    base_url: Url,
    retry: RetryPolicy,
    rate_limiter: RateLimiter,
}

impl ResilientHttpClient {
    pub fn new(config: ClientConfig, rate_limiter: RateLimiter) -> RequestOutcome<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| RequestError::InvalidRequest(format!("{}: {}", config.base_url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .timeout(config.timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            base_url,
            retry: config.retry,
            rate_limiter,
        })
    }

    /// Get the rate limiter for this client.
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    fn resolve(&self, path: &str) -> RequestOutcome<Url> {
        let resolved = if path.starts_with("http://") || path.starts_with("https://") {
            Url::parse(path)
        } else {
            self.base_url.join(path)
        };
        resolved.map_err(|e| RequestError::InvalidRequest(format!("{}: {}", path, e)))
    }

    /// Execute a request, retrying transient failures per the retry policy.
    ///
    /// The last classified failure is returned once attempts are exhausted.
    pub async fn execute(&self, request: &ApiRequest) -> RequestOutcome<ApiResponse> {
        let url = self.resolve(&request.path)?;
        let key = RateLimiter::host_key(&url);
        let max_attempts = self.retry.max_attempts.max(1);

        let mut attempt = 1;
        loop {
            match self.send_once(&key, &url, request).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.delay_for(&err, attempt);
                    warn!(
                        method = %request.method,
                        url = %url,
                        attempt,
                        ?delay,
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    debug!(method = %request.method, url = %url, attempt, error = %err, "request failed");
                    return Err(err);
                }
            }
        }
    }

    /// Execute and decode the JSON body.
    pub async fn execute_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> RequestOutcome<T> {
        self.execute(request).await?.json()
    }

    async fn send_once(&self, key: &str, url: &Url, request: &ApiRequest) -> RequestOutcome<ApiResponse> {
        self.rate_limiter.acquire(key).await;

        let mut builder = self.client.request(request.method.clone(), url.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        match &request.body {
            Some(RequestBody::Json(value)) => builder = builder.json(value),
            Some(RequestBody::Form(fields)) => builder = builder.form(fields),
            None => {}
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(RequestError::from)?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response
            .text()
            .await
            .map_err(|e| RequestError::Network(e.to_string()))?;

        if status.is_success() {
            debug!(method = %request.method, url = %url, status = status.as_u16(), "request ok");
            return Ok(ApiResponse {
                status: status.as_u16(),
                body,
            });
        }

        let err = RequestError::from_status(status.as_u16(), retry_after.as_deref(), body);
        if let RequestError::RateLimited { retry_after } = &err {
            warn!(url = %url, ?retry_after, "rate limit hit");
        }
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
        assert_eq!(policy.backoff(3), Duration::from_secs(8));
        assert_eq!(policy.backoff(4), Duration::from_secs(10));
        assert_eq!(policy.backoff(40), Duration::from_secs(10));
    }

    #[test]
    fn test_backoff_is_monotonic() {
        let policy = RetryPolicy::default();
        let delays: Vec<_> = (1..=6).map(|n| policy.backoff(n)).collect();
        assert!(delays.windows(2).all(|w| w[1] >= w[0]));
        assert!(delays.iter().all(|d| *d <= policy.max_delay));
    }

    #[test]
    fn test_rate_limit_delay_honours_retry_after_within_cap() {
        let policy = RetryPolicy::default();
        let short = RequestError::RateLimited {
            retry_after: Duration::from_secs(1),
        };
        let long = RequestError::RateLimited {
            retry_after: Duration::from_secs(5),
        };
        let huge = RequestError::RateLimited {
            retry_after: Duration::from_secs(120),
        };
        assert_eq!(policy.delay_for(&short, 1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(&long, 1), Duration::from_secs(5));
        assert_eq!(policy.delay_for(&huge, 1), Duration::from_secs(10));
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let client = ResilientHttpClient::new(
            ClientConfig::new("https://api.hh.ru"),
            RateLimiter::new(),
        )
        .unwrap();
        assert_eq!(
            client.resolve("/vacancies").unwrap().as_str(),
            "https://api.hh.ru/vacancies"
        );
        assert_eq!(
            client.resolve("https://hh.ru/oauth/token").unwrap().as_str(),
            "https://hh.ru/oauth/token"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = ResilientHttpClient::new(ClientConfig::new("not a url"), RateLimiter::new())
            .unwrap_err();
        assert!(matches!(err, RequestError::InvalidRequest(_)));
    }
}
