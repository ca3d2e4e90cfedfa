//! Per-key sliding request window.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Timestamps of the requests admitted for one key within the trailing window.
///
/// Entries are appended in admission order, so the front is always the oldest.
#[derive(Debug, Clone)]
pub struct RateWindow {
    timestamps: VecDeque<Instant>,
    limit: usize,
    window: Duration,
    /// Total requests admitted.
    pub total_requests: u64,
    /// Admissions that had to wait for the window to slide.
    pub throttled_requests: u64,
}

impl RateWindow {
    pub fn new(limit: usize, window: Duration) -> Self {
        let limit = limit.max(1);
        Self {
            timestamps: VecDeque::with_capacity(limit),
            limit,
            window,
            total_requests: 0,
            throttled_requests: 0,
        }
    }

    /// Drop timestamps that have left the window as of `now`.
    pub fn purge(&mut self, now: Instant) {
        while let Some(oldest) = self.timestamps.front() {
            if now.duration_since(*oldest) >= self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Time until one more request fits. Call after [`purge`](Self::purge).
    pub fn wait_time(&self, now: Instant) -> Duration {
        if self.timestamps.len() < self.limit {
            return Duration::ZERO;
        }
        match self.timestamps.front() {
            Some(oldest) => self.window.saturating_sub(now.duration_since(*oldest)),
            None => Duration::ZERO,
        }
    }

    /// Record an admitted request.
    pub fn record(&mut self, now: Instant) {
        self.timestamps.push_back(now);
        self.total_requests += 1;
        debug_assert!(self.timestamps.len() <= self.limit);
    }

    /// Requests currently inside the window.
    pub fn in_window(&self) -> usize {
        self.timestamps.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
