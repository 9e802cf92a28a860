use serde::Deserialize;
use std::time::Duration;

/// Backoff policy for model HTTP calls.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total number of attempts, the first one included.
    pub attempts: u32,
    pub initial_delay_secs: f64,
    /// Multiplier applied to the delay after every failed attempt.
    pub exp_base: f64,
    /// Upper bound for any single delay.
    pub max_delay_secs: f64,
    pub http_status_codes: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 5,
            initial_delay_secs: 1.0,
            exp_base: 7.0,
            max_delay_secs: 60.0,
            http_status_codes: vec![429, 500, 503, 504],
        }
    }
}

impl RetryConfig {
    pub fn retries_status(&self, status: u16) -> bool {
        self.http_status_codes.contains(&status)
    }

    /// Delay to wait after the given failed attempt (1-based), capped at
    /// `max_delay_secs`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let secs = self.initial_delay_secs * self.exp_base.powi(exponent);
        let secs = secs.min(self.max_delay_secs);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_exponentially() {
        let retry = RetryConfig::default();
        assert_eq!(retry.delay_for(1), Duration::from_secs(1));
        assert_eq!(retry.delay_for(2), Duration::from_secs(7));
        assert_eq!(retry.delay_for(3), Duration::from_secs(49));
    }

    #[test]
    fn late_attempts_are_capped() {
        let retry = RetryConfig::default();
        assert_eq!(retry.delay_for(4), Duration::from_secs(60));
        assert_eq!(retry.delay_for(40), Duration::from_secs(60));

        let tight = RetryConfig {
            max_delay_secs: 5.0,
            ..RetryConfig::default()
        };
        assert_eq!(tight.delay_for(1), Duration::from_secs(1));
        assert_eq!(tight.delay_for(2), Duration::from_secs(5));
    }

    #[test]
    fn only_listed_statuses_are_retried() {
        let retry = RetryConfig::default();
        assert!(retry.retries_status(429));
        assert!(retry.retries_status(503));
        assert!(!retry.retries_status(400));
        assert!(!retry.retries_status(502));
    }
}
