//! Token-mask fragment: allow/deny rules over vocabulary symbols.
//!
//! A symbol is permitted iff it matches every allow rule and no deny rule.
//! Adding a rule can therefore only shrink the permitted set.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constraint::{MaskAction, SymbolMatcher};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskRule {
    pub action: MaskAction,
    pub matcher: SymbolMatcher,
    pub source_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenMaskFragment {
    pub rules: Vec<MaskRule>,
}

/// Outcome of evaluating one symbol against a mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaskVerdict {
    Permitted,
    /// Matched the deny rule from this constraint.
    DeniedBy(String),
    /// Failed to match the allow rule from this constraint.
    NotAllowedBy(String),
}

impl MaskVerdict {
    pub fn is_permitted(&self) -> bool {
        matches!(self, Self::Permitted)
    }
}

enum CompiledMatcher<'a> {
    Literals(&'a std::collections::BTreeSet<String>),
    Prefix(&'a str),
    Pattern(Regex),
}

impl CompiledMatcher<'_> {
    fn matches(&self, symbol: &str) -> bool {
        match self {
            Self::Literals(set) => set.contains(symbol),
            Self::Prefix(prefix) => symbol.starts_with(prefix),
            Self::Pattern(re) => re.is_match(symbol),
        }
    }
}

/// A fragment with its patterns compiled, ready for repeated evaluation.
pub struct MaskEvaluator<'a> {
    rules: Vec<(MaskAction, CompiledMatcher<'a>, &'a str)>,
}

impl TokenMaskFragment {
    /// Compile pattern matchers once. Patterns are anchored to the whole symbol.
    pub fn evaluator(&self) -> Result<MaskEvaluator<'_>, regex::Error> {
        let rules = self
            .rules
            .iter()
            .map(|rule| {
                let matcher = match &rule.matcher {
                    SymbolMatcher::Literals(set) => CompiledMatcher::Literals(set),
                    SymbolMatcher::Prefix(p) => CompiledMatcher::Prefix(p),
                    SymbolMatcher::Pattern(p) => {
                        CompiledMatcher::Pattern(Regex::new(&format!("^(?:{p})$"))?)
                    }
                };
                Ok((rule.action, matcher, rule.source_id.as_str()))
            })
            .collect::<Result<_, regex::Error>>()?;
        Ok(MaskEvaluator { rules })
    }

    /// One-shot convenience over [`TokenMaskFragment::evaluator`].
    pub fn permits(&self, symbol: &str) -> Result<bool, regex::Error> {
        Ok(self.evaluator()?.permits(symbol))
    }
}

impl MaskEvaluator<'_> {
    pub fn verdict(&self, symbol: &str) -> MaskVerdict {
        // Deny wins over a failed allow so the reported cause is the explicit one.
        if let Some((_, _, id)) = self
            .rules
            .iter()
            .find(|(action, m, _)| *action == MaskAction::Deny && m.matches(symbol))
        {
            return MaskVerdict::DeniedBy((*id).to_string());
        }
        if let Some((_, _, id)) = self
            .rules
            .iter()
            .find(|(action, m, _)| *action == MaskAction::Allow && !m.matches(symbol))
        {
            return MaskVerdict::NotAllowedBy((*id).to_string());
        }
        MaskVerdict::Permitted
    }

    pub fn permits(&self, symbol: &str) -> bool {
        self.verdict(symbol).is_permitted()
    }
}
