//! Token-mask compiler: ordered allow/deny rules over vocabulary symbols.

use regex::Regex;

use tether_core::errors::CompileError;
use tether_core::ir::{MaskRule, TokenMaskFragment};
use tether_core::{Constraint, Enforcement, PatternSpec, SymbolMatcher};

use super::RepresentationCompiler;

#[derive(Debug, Clone, Copy, Default)]
pub struct TokenMaskCompiler;

impl RepresentationCompiler for TokenMaskCompiler {
    type Fragment = TokenMaskFragment;
    const TARGET: Enforcement = Enforcement::TokenMask;

    fn compile(
        &self,
        constraints: &[&Constraint],
    ) -> Result<Option<TokenMaskFragment>, CompileError> {
        let targeted = Self::targeted(constraints);
        if targeted.is_empty() {
            return Ok(None);
        }

        let mut rules = Vec::with_capacity(targeted.len());
        for c in targeted {
            let PatternSpec::TokenRule { action, matcher } = &c.spec else {
                return Err(CompileError::invalid(
                    &c.id,
                    "token-mask constraint without a token rule",
                ));
            };
            match matcher {
                SymbolMatcher::Literals(set)
                    if set.is_empty() || set.iter().any(String::is_empty) =>
                {
                    return Err(CompileError::invalid(
                        &c.id,
                        "literal set is empty or holds an empty literal",
                    ));
                }
                SymbolMatcher::Prefix(p) if p.is_empty() => {
                    return Err(CompileError::invalid(&c.id, "empty prefix"));
                }
                SymbolMatcher::Pattern(p) => {
                    Regex::new(&format!("^(?:{p})$")).map_err(|e| CompileError::InvalidPattern {
                        constraint_id: c.id.clone(),
                        pattern: p.clone(),
                        reason: e.to_string(),
                    })?;
                }
                _ => {}
            }
            rules.push(MaskRule {
                action: *action,
                matcher: matcher.clone(),
                source_id: c.id.clone(),
            });
        }
        Ok(Some(TokenMaskFragment { rules }))
    }
}
