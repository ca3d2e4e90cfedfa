//! Outbound HTTP plumbing: rate limiting, outcome classification, retries.

pub mod client;
pub mod outcome;
pub mod rate_limiter;

pub use client::{
    ApiRequest, ApiResponse, ClientConfig, RequestBody, ResilientHttpClient, RetryPolicy,
};
pub use outcome::{RequestError, RequestOutcome};
pub use rate_limiter::{KeyStats, RateLimitConfig, RateLimiter};
