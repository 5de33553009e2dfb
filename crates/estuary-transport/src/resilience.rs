//! Reconnect/backoff policy shared by every network transport (SSE,
//! streamable HTTP, remote-slave WebSocket). Stdio has no network to retry
//! against and does not use this module.

use std::time::Duration;

/// Exponential backoff with a ceiling, modeled on the retry policy the
/// streamable HTTP client computes its reconnect delay from.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the `attempt`-th retry (0-indexed).
    pub fn delay(&self, attempt: u32) -> Duration {
        let scaled = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        Duration::from_secs_f64(scaled.min(self.max_delay.as_secs_f64()))
    }

    pub fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt >= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_then_caps() {
        let policy = ReconnectPolicy {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_attempts: None,
        };
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(10), Duration::from_secs(1));
    }

    #[test]
    fn exhausted_respects_max_attempts() {
        let policy = ReconnectPolicy { max_attempts: Some(3), ..Default::default() };
        assert!(!policy.exhausted(2));
        assert!(policy.exhausted(3));
    }
}
