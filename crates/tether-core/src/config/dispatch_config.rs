//! Dispatcher retry, timeout and pool settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DispatchConfig {
    /// Total attempts including the first. Default: 3.
    pub max_attempts: Option<u32>,
    /// Backoff before the first retry. Default: 100ms.
    pub initial_backoff_ms: Option<u64>,
    /// Backoff ceiling. Default: 5s.
    pub max_backoff_ms: Option<u64>,
    /// Per-request budget across all attempts. Default: 30s.
    pub request_timeout_ms: Option<u64>,
    /// Maximum concurrent backend calls. Default: 8.
    pub max_concurrency: Option<usize>,
    /// Randomize backoff delays. Default: true.
    pub jitter: Option<bool>,
}

impl DispatchConfig {
    pub fn effective_max_attempts(&self) -> u32 {
        self.max_attempts.unwrap_or(defaults::DEFAULT_MAX_ATTEMPTS)
    }

    pub fn effective_initial_backoff(&self) -> Duration {
        Duration::from_millis(
            self.initial_backoff_ms
                .unwrap_or(defaults::DEFAULT_INITIAL_BACKOFF_MS),
        )
    }

    pub fn effective_max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms.unwrap_or(defaults::DEFAULT_MAX_BACKOFF_MS))
    }

    pub fn effective_request_timeout(&self) -> Duration {
        Duration::from_millis(
            self.request_timeout_ms
                .unwrap_or(defaults::DEFAULT_REQUEST_TIMEOUT_MS),
        )
    }

    pub fn effective_max_concurrency(&self) -> usize {
        self.max_concurrency
            .unwrap_or(defaults::DEFAULT_MAX_CONCURRENCY)
    }

    pub fn effective_jitter(&self) -> bool {
        self.jitter.unwrap_or(defaults::DEFAULT_JITTER)
    }
}
