//! Regex compiler: per-field format patterns, anchored and size-limited.

use regex::RegexBuilder;

use tether_core::config::defaults::DEFAULT_REGEX_SIZE_LIMIT;
use tether_core::errors::CompileError;
use tether_core::ir::{NamedPattern, RegexFragment};
use tether_core::{Constraint, Enforcement, PatternSpec};

use super::RepresentationCompiler;

#[derive(Debug, Clone, Copy)]
pub struct RegexCompiler {
    size_limit: usize,
}

impl RegexCompiler {
    pub fn new(size_limit: usize) -> Self {
        Self { size_limit }
    }
}

impl Default for RegexCompiler {
    fn default() -> Self {
        Self::new(DEFAULT_REGEX_SIZE_LIMIT)
    }
}

/// Wrap `pattern` so it must match a whole value.
///
/// Always wraps, since `^` and `$` alone do not anchor a top-level
/// alternation: `^a|b$` is `(^a)|(b$)`.
pub fn anchor(pattern: &str) -> String {
    format!("^(?:{pattern})$")
}

impl RepresentationCompiler for RegexCompiler {
    type Fragment = RegexFragment;
    const TARGET: Enforcement = Enforcement::Regex;

    fn compile(&self, constraints: &[&Constraint]) -> Result<Option<RegexFragment>, CompileError> {
        let targeted = Self::targeted(constraints);
        if targeted.is_empty() {
            return Ok(None);
        }

        let mut patterns = Vec::with_capacity(targeted.len());
        for c in targeted {
            let PatternSpec::Regex { field, pattern } = &c.spec else {
                return Err(CompileError::invalid(
                    &c.id,
                    "regex constraint without a regex payload",
                ));
            };
            if field.trim().is_empty() {
                return Err(CompileError::invalid(&c.id, "regex constraint names no field"));
            }
            if pattern.is_empty() {
                return Err(CompileError::InvalidPattern {
                    constraint_id: c.id.clone(),
                    pattern: pattern.clone(),
                    reason: "empty pattern".to_string(),
                });
            }

            let anchored = anchor(pattern);
            RegexBuilder::new(&anchored)
                .size_limit(self.size_limit)
                .build()
                .map_err(|e| CompileError::InvalidPattern {
                    constraint_id: c.id.clone(),
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;

            patterns.push(NamedPattern {
                name: field.clone(),
                pattern: anchored,
                source: pattern.clone(),
                source_id: c.id.clone(),
            });
        }
        Ok(Some(RegexFragment { patterns }))
    }
}

#[cfg(test)]
mod tests {
    use tether_core::Priority;

    use super::*;

    fn compile_one(pattern: &str) -> Result<Option<RegexFragment>, CompileError> {
        let c = Constraint::regex("fmt", Priority::High, "amount", pattern);
        RegexCompiler::default().compile(&[&c])
    }

    #[test]
    fn anchor_always_wraps() {
        assert_eq!(anchor("[0-9]+"), "^(?:[0-9]+)$");
        assert_eq!(anchor("^[0-9]+$"), "^(?:^[0-9]+$)$");
        assert_eq!(anchor(r"^cost\$"), r"^(?:^cost\$)$");
    }

    #[test]
    fn top_level_alternation_is_anchored_as_a_whole() {
        let fragment = compile_one("^a|b$").unwrap().unwrap();
        assert_eq!(fragment.patterns[0].pattern, "^(?:^a|b$)$");
        assert_eq!(fragment.patterns[0].source, "^a|b$");
        assert!(fragment.accepts("amount", "a"));
        assert!(fragment.accepts("amount", "b"));
        assert!(!fragment.accepts("amount", "a-anything"));
        assert!(!fragment.accepts("amount", "xxb"));
    }

    #[test]
    fn compiled_pattern_matches_whole_value() {
        let fragment = compile_one(r"[0-9]+\.[0-9]{2}").unwrap().unwrap();
        assert!(fragment.accepts("amount", "12.50"));
        assert!(!fragment.accepts("amount", "x12.50y"));
        assert_eq!(fragment.patterns[0].source_id, "fmt");
    }

    #[test]
    fn malformed_pattern_is_rejected() {
        let err = compile_one("([0-9]+").unwrap_err();
        assert!(matches!(
            err,
            CompileError::InvalidPattern { ref constraint_id, ref pattern, .. }
                if constraint_id == "fmt" && pattern == "([0-9]+"
        ));
    }

    #[test]
    fn oversized_pattern_is_rejected() {
        let c = Constraint::regex("big", Priority::High, "x", r"\w{1000}");
        let err = RegexCompiler::new(1024).compile(&[&c]).unwrap_err();
        assert!(matches!(err, CompileError::InvalidPattern { .. }));
    }

    #[test]
    fn empty_pattern_is_rejected() {
        assert!(matches!(
            compile_one("").unwrap_err(),
            CompileError::InvalidPattern { .. }
        ));
    }
}
