//! Sliding-window rate limiter for the pairing endpoints (spec 8:
//! "Pairing-code rate limiter must reject the (N+1)th attempt within the
//! window from the same IP"). Adapted from the teacher's auth-endpoint rate
//! limiter: same sliding-window-over-timestamps algorithm, narrowed to the
//! single IP-keyed dimension pairing actually needs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct RateLimitKey(String);

impl RateLimitKey {
    pub fn ip(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_attempts: u32,
    pub window: Duration,
}

impl RateLimitConfig {
    /// Spec 8's recommended default: 5 attempts per 60s per source IP.
    pub fn recommended() -> Self {
        Self { max_attempts: 5, window: Duration::from_secs(60) }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    pub retry_after: Duration,
    pub current_count: u32,
    pub limit: u32,
}

#[derive(Debug, Default)]
struct Tracker {
    timestamps: Vec<Instant>,
}

/// Per-endpoint sliding-window limiter keyed by source IP.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    entries: Arc<RwLock<HashMap<(RateLimitKey, &'static str), Tracker>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self { config, entries: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub fn disabled() -> Self {
        Self::new(RateLimitConfig { max_attempts: u32::MAX, window: Duration::from_secs(1) })
    }

    /// Checks and records one attempt atomically. `Ok(())` means the
    /// request is allowed and has been counted; `Err` carries retry-after
    /// info for a 429 response.
    pub async fn check(&self, key: &RateLimitKey, endpoint: &'static str) -> Result<(), RateLimitInfo> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let tracker = entries.entry((key.clone(), endpoint)).or_default();

        let window_start = now - self.config.window;
        tracker.timestamps.retain(|&t| t > window_start);

        let current_count = tracker.timestamps.len() as u32;
        if current_count >= self.config.max_attempts {
            let oldest = tracker.timestamps.first().copied().unwrap_or(now);
            let retry_after = self.config.window.saturating_sub(now - oldest);
            return Err(RateLimitInfo {
                retry_after,
                current_count,
                limit: self.config.max_attempts,
            });
        }

        tracker.timestamps.push(now);
        Ok(())
    }

    /// Reports whether `key` is currently over budget without recording an
    /// attempt (spec: "Failed attempts count; successes do not extend the
    /// counter" — callers that only want to charge the budget on failure
    /// peek here first, then call [`Self::record_failure`] themselves).
    pub async fn peek(&self, key: &RateLimitKey, endpoint: &'static str) -> Result<(), RateLimitInfo> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let tracker = entries.entry((key.clone(), endpoint)).or_default();

        let window_start = now - self.config.window;
        tracker.timestamps.retain(|&t| t > window_start);

        let current_count = tracker.timestamps.len() as u32;
        if current_count >= self.config.max_attempts {
            let oldest = tracker.timestamps.first().copied().unwrap_or(now);
            let retry_after = self.config.window.saturating_sub(now - oldest);
            return Err(RateLimitInfo {
                retry_after,
                current_count,
                limit: self.config.max_attempts,
            });
        }
        Ok(())
    }

    /// Records one failed attempt against the budget.
    pub async fn record_failure(&self, key: &RateLimitKey, endpoint: &'static str) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let tracker = entries.entry((key.clone(), endpoint)).or_default();
        let window_start = now - self.config.window;
        tracker.timestamps.retain(|&t| t > window_start);
        tracker.timestamps.push(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_the_configured_limit() {
        let limiter = RateLimiter::new(RateLimitConfig { max_attempts: 5, window: Duration::from_secs(60) });
        let key = RateLimitKey::ip("127.0.0.1");
        for _ in 0..5 {
            assert!(limiter.check(&key, "pair").await.is_ok());
        }
        assert!(limiter.check(&key, "pair").await.is_err());
    }

    #[tokio::test]
    async fn distinct_ips_get_independent_budgets() {
        let limiter = RateLimiter::new(RateLimitConfig { max_attempts: 1, window: Duration::from_secs(60) });
        let a = RateLimitKey::ip("10.0.0.1");
        let b = RateLimitKey::ip("10.0.0.2");
        assert!(limiter.check(&a, "pair").await.is_ok());
        assert!(limiter.check(&b, "pair").await.is_ok());
        assert!(limiter.check(&a, "pair").await.is_err());
    }

    #[tokio::test]
    async fn disabled_limiter_never_blocks() {
        let limiter = RateLimiter::disabled();
        let key = RateLimitKey::ip("127.0.0.1");
        for _ in 0..1000 {
            assert!(limiter.check(&key, "pair").await.is_ok());
        }
    }
}
