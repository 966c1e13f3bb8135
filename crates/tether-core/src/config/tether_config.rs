//! Top-level Tether configuration with layered resolution.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{CacheConfig, CompilerConfig, DispatchConfig};
use crate::errors::ConfigError;

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. Environment variables (`TETHER_*`)
/// 2. TOML file, when a path is given
/// 3. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TetherConfig {
    pub compiler: CompilerConfig,
    pub cache: CacheConfig,
    pub dispatch: DispatchConfig,
}

impl TetherConfig {
    /// Load configuration, optionally from a TOML file, then apply env
    /// overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Self::apply_env_overrides(&mut config);
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML string (for testing). Not validated.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Validate the configuration values.
    pub fn validate(config: &TetherConfig) -> Result<(), ConfigError> {
        if config.cache.effective_capacity() == 0 {
            return Err(invalid("cache.capacity", "must be greater than 0"));
        }
        if config.compiler.effective_regex_size_limit() == 0 {
            return Err(invalid("compiler.regex_size_limit", "must be greater than 0"));
        }
        let dispatch = &config.dispatch;
        if dispatch.effective_max_attempts() == 0 {
            return Err(invalid("dispatch.max_attempts", "must be at least 1"));
        }
        if dispatch.effective_max_concurrency() == 0 {
            return Err(invalid("dispatch.max_concurrency", "must be at least 1"));
        }
        if dispatch.effective_request_timeout().is_zero() {
            return Err(invalid("dispatch.request_timeout_ms", "must be greater than 0"));
        }
        if dispatch.effective_initial_backoff() > dispatch.effective_max_backoff() {
            return Err(invalid(
                "dispatch.initial_backoff_ms",
                "must not exceed dispatch.max_backoff_ms",
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides.
    /// Pattern: `TETHER_CACHE_CAPACITY`, `TETHER_DISPATCH_MAX_ATTEMPTS`, etc.
    /// Unparseable values are ignored.
    fn apply_env_overrides(config: &mut TetherConfig) {
        if let Some(v) = env_parse("TETHER_CACHE_CAPACITY") {
            config.cache.capacity = Some(v);
        }
        if let Some(v) = env_parse("TETHER_COMPILER_MAX_GRAMMAR_EXPANSION") {
            config.compiler.max_grammar_expansion = Some(v);
        }
        if let Some(v) = env_parse("TETHER_COMPILER_REGEX_SIZE_LIMIT") {
            config.compiler.regex_size_limit = Some(v);
        }
        if let Some(v) = env_parse("TETHER_DISPATCH_MAX_ATTEMPTS") {
            config.dispatch.max_attempts = Some(v);
        }
        if let Some(v) = env_parse("TETHER_DISPATCH_INITIAL_BACKOFF_MS") {
            config.dispatch.initial_backoff_ms = Some(v);
        }
        if let Some(v) = env_parse("TETHER_DISPATCH_MAX_BACKOFF_MS") {
            config.dispatch.max_backoff_ms = Some(v);
        }
        if let Some(v) = env_parse("TETHER_DISPATCH_REQUEST_TIMEOUT_MS") {
            config.dispatch.request_timeout_ms = Some(v);
        }
        if let Some(v) = env_parse("TETHER_DISPATCH_MAX_CONCURRENCY") {
            config.dispatch.max_concurrency = Some(v);
        }
        if let Some(v) = env_parse("TETHER_DISPATCH_JITTER") {
            config.dispatch.jitter = Some(v);
        }
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.parse().ok()
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::ValidationFailed {
        field: field.to_string(),
        message: message.to_string(),
    }
}
