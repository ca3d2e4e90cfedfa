//! Per-host sliding-window rate limiter.
//!
//! Every outbound request calls [`RateLimiter::acquire`] with the host it is
//! about to hit. At most `limit` requests per key are admitted in any trailing
//! `window`; callers beyond that suspend until the oldest admission expires.
//! Each key has its own lock, so a slow host never blocks traffic to another.

mod window;

pub use window::RateWindow;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;
use url::Url;

/// Configuration for rate limiting behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests admitted per key within `window`.
    pub limit: usize,
    /// Length of the trailing window.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 5,
            window: Duration::from_secs(1),
        }
    }
}

/// Sliding-window limiter shared by every pass in the process.
///
/// Cloning is cheap and clones share state.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Arc<RwLock<HashMap<String, Arc<Mutex<RateWindow>>>>>,
}

impl RateLimiter {
    /// Create a new rate limiter with default config.
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::default())
    }

    /// Create a new rate limiter with custom config.
    pub fn with_config(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Rate limit key for a URL: its host, or `"default"` for host-less URLs.
    pub fn host_key(url: &Url) -> String {
        url.host_str().unwrap_or("default").to_string()
    }

    async fn window_for(&self, key: &str) -> Arc<Mutex<RateWindow>> {
        if let Some(window) = self.windows.read().await.get(key) {
            return window.clone();
        }
        let mut windows = self.windows.write().await;
        windows
            .entry(key.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(RateWindow::new(
                    self.config.limit,
                    self.config.window,
                )))
            })
            .clone()
    }

    /// Wait until one more request under `key` fits in the window, then record it.
    ///
    /// Waiters on the same key are admitted in arrival order; the key's lock is
    /// held across the wait.
    pub async fn acquire(&self, key: &str) {
        let window = self.window_for(key).await;
        let mut window = window.lock().await;

        let now = Instant::now();
        window.purge(now);
        let wait = window.wait_time(now);
        if wait > Duration::ZERO {
            debug!(key, ?wait, "rate window full, waiting");
            window.throttled_requests += 1;
            tokio::time::sleep(wait).await;
            window.purge(Instant::now());
        }

        window.record(Instant::now());
    }

    /// Statistics for all keys seen so far.
    pub async fn get_stats(&self) -> HashMap<String, KeyStats> {
        // Snapshot the map first; a key lock can be held for a whole window.
        let windows: Vec<(String, Arc<Mutex<RateWindow>>)> = self
            .windows
            .read()
            .await
            .iter()
            .map(|(key, window)| (key.clone(), window.clone()))
            .collect();

        let mut stats = HashMap::with_capacity(windows.len());
        for (key, window) in windows {
            let mut window = window.lock().await;
            window.purge(Instant::now());
            stats.insert(
                key,
                KeyStats {
                    in_window: window.in_window(),
                    total_requests: window.total_requests,
                    throttled_requests: window.throttled_requests,
                },
            );
        }
        stats
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStats {
    pub in_window: usize,
    pub total_requests: u64,
    pub throttled_requests: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(limit: usize, window_ms: u64) -> RateLimiter {
        RateLimiter::with_config(RateLimitConfig {
            limit,
            window: Duration::from_millis(window_ms),
        })
    }

    #[test]
    fn test_host_key() {
        let url = Url::parse("https://api.hh.ru/vacancies?page=1").unwrap();
        assert_eq!(RateLimiter::host_key(&url), "api.hh.ru");
        let url = Url::parse("https://hh.ru/oauth/token").unwrap();
        assert_eq!(RateLimiter::host_key(&url), "hh.ru");
        let url = Url::parse("data:text/plain,hi").unwrap();
        assert_eq!(RateLimiter::host_key(&url), "default");
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_requests_proceed_immediately() {
        let limiter = limiter(3, 1000);
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire("api.example.com").await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_oldest_to_expire() {
        let limiter = limiter(2, 1000);
        let start = Instant::now();
        limiter.acquire("api.example.com").await;
        tokio::time::advance(Duration::from_millis(250)).await;
        limiter.acquire("api.example.com").await;

        limiter.acquire("api.example.com").await;
        assert_eq!(start.elapsed(), Duration::from_millis(1000));

        limiter.acquire("api.example.com").await;
        assert_eq!(start.elapsed(), Duration::from_millis(1250));

        let stats = limiter.get_stats().await;
        let key = &stats["api.example.com"];
        assert_eq!(key.total_requests, 4);
        assert_eq!(key.throttled_requests, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_do_not_stall_other_keys() {
        let limiter = limiter(1, 60_000);
        limiter.acquire("slow.example.com").await;

        let waiter = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire("slow.example.com").await })
        };
        tokio::task::yield_now().await;
        let stats = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.get_stats().await })
        };
        tokio::task::yield_now().await;

        let start = Instant::now();
        limiter.acquire("new.example.com").await;
        limiter.acquire("other.example.com").await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        waiter.await.unwrap();
        let stats = stats.await.unwrap();
        assert_eq!(stats["slow.example.com"].total_requests, 2);
        assert_eq!(stats["slow.example.com"].throttled_requests, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_never_exceeds_limit() {
        let limit = 3;
        let window = Duration::from_millis(500);
        let limiter = limiter(limit, 500);
        let completions = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let limiter = limiter.clone();
            let completions = completions.clone();
            handles.push(tokio::spawn(async move {
                limiter.acquire("api.example.com").await;
                completions.lock().await.push(Instant::now());
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut times = completions.lock().await.clone();
        times.sort();
        assert_eq!(times.len(), 20);
        for (i, start) in times.iter().enumerate() {
            let in_window = times[i..]
                .iter()
                .take_while(|t| t.duration_since(*start) < window)
                .count();
            assert!(in_window <= limit, "{} requests inside one window", in_window);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_do_not_block_each_other() {
        let limiter = limiter(1, 60_000);
        limiter.acquire("slow.example.com").await;

        let blocked = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire("slow.example.com").await })
        };
        tokio::task::yield_now().await;

        let start = Instant::now();
        limiter.acquire("fast.example.com").await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(!blocked.is_finished());

        blocked.abort();
    }
}
