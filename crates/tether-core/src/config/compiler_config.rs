//! Compiler limits.

use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CompilerConfig {
    /// Strings enumerated per bound grammar rule when cross-checking the
    /// schema and regex fragments. Larger languages are not cross-checked.
    pub max_grammar_expansion: Option<usize>,
    /// Size limit for compiled regex programs, in bytes.
    pub regex_size_limit: Option<usize>,
}

impl CompilerConfig {
    pub fn effective_max_grammar_expansion(&self) -> usize {
        self.max_grammar_expansion
            .unwrap_or(defaults::DEFAULT_MAX_GRAMMAR_EXPANSION)
    }

    pub fn effective_regex_size_limit(&self) -> usize {
        self.regex_size_limit
            .unwrap_or(defaults::DEFAULT_REGEX_SIZE_LIMIT)
    }
}
