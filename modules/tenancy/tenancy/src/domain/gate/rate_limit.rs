//! Fixed-window request rate limiting.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tenancy_sdk::TenancyError;

/// Per-key rate limiter over a rolling window.
///
/// Each key tracks an append-only list of request timestamps, pruned of
/// entries older than the window on every check. Keys that stop receiving
/// traffic keep their last entries until [`RateLimiter::sweep`] runs; the
/// server calls it on a timer so idle keys do not accumulate.
pub struct RateLimiter {
    window: Duration,
    max_requests: usize,
    hits: DashMap<String, Vec<Instant>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            window,
            max_requests,
            hits: DashMap::new(),
        }
    }

    /// Record one request for `key`.
    ///
    /// # Errors
    /// Returns [`TenancyError::RateLimited`] with a retry hint once the key
    /// has `max_requests` requests inside the window.
    pub fn check(&self, key: &str) -> Result<(), TenancyError> {
        let now = Instant::now();
        let mut entry = self.hits.entry(key.to_owned()).or_default();

        entry.retain(|t| now.duration_since(*t) < self.window);

        if entry.len() >= self.max_requests {
            // The slot frees up when the oldest in-window hit expires.
            let oldest = entry.first().copied().unwrap_or(now);
            let elapsed = now.duration_since(oldest);
            let retry_after = self.window.saturating_sub(elapsed);
            return Err(TenancyError::RateLimited { retry_after });
        }

        entry.push(now);
        Ok(())
    }

    /// Remove keys whose every entry has aged out of the window.
    pub fn sweep(&self) {
        let now = Instant::now();
        self.hits
            .retain(|_, hits| hits.iter().any(|t| now.duration_since(*t) < self.window));
    }

    /// Number of tracked keys (diagnostics and tests).
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.hits.len()
    }
}
