//! Retry policy: bounded attempts with capped exponential backoff.

use std::time::Duration;

use rand::Rng;

use tether_core::config::DispatchConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Equal jitter: a delay `d` becomes uniform in `[d/2, d]`.
    pub jitter: bool,
}

impl RetryPolicy {
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            max_attempts: config.effective_max_attempts().max(1),
            initial_backoff: config.effective_initial_backoff(),
            max_backoff: config.effective_max_backoff(),
            jitter: config.effective_jitter(),
        }
    }

    /// Un-jittered delay after failed attempt `attempt` (1-based):
    /// `initial * 2^(attempt - 1)`, capped at `max_backoff`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }

    /// Delay to wait before the attempt following `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if !self.jitter || base.is_zero() {
            return base;
        }
        let half = base / 2;
        let spread = (base - half).as_millis() as u64;
        half + Duration::from_millis(rand::rng().random_range(0..=spread))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}
