//! Artifact cache configuration.

use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of compiled IRs kept. Default: 256.
    pub capacity: Option<u64>,
}

impl CacheConfig {
    pub fn effective_capacity(&self) -> u64 {
        self.capacity.unwrap_or(defaults::DEFAULT_CACHE_CAPACITY)
    }
}
