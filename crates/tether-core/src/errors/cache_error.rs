//! Cache errors. Recovered locally by recompiling; never caller-visible.

use super::error_code::{self, TetherErrorCode};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache entry {fingerprint} failed integrity check: {reason}")]
    CacheCorruption { fingerprint: String, reason: String },
}

impl TetherErrorCode for CacheError {
    fn error_code(&self) -> &'static str {
        error_code::CACHE_CORRUPTION
    }
}
