//! Regex fragment: per-field format patterns.

use std::collections::BTreeSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A compiled pattern for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedPattern {
    /// Field the pattern applies to.
    pub name: String,
    /// Whole-value form, `^(?:source)$`. This is what gets matched.
    pub pattern: String,
    /// The expression as declared.
    pub source: String,
    pub source_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegexFragment {
    pub patterns: Vec<NamedPattern>,
}

impl RegexFragment {
    /// All patterns applying to `field`. A value must match every one of them.
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a NamedPattern> + 'a {
        self.patterns.iter().filter(move |p| p.name == field)
    }

    /// Distinct constrained fields, sorted.
    pub fn fields(&self) -> BTreeSet<&str> {
        self.patterns.iter().map(|p| p.name.as_str()).collect()
    }

    /// Compile every pattern, keyed by field name in fragment order.
    pub fn compile(&self) -> Result<Vec<(&str, Regex)>, regex::Error> {
        self.patterns
            .iter()
            .map(|p| Ok((p.name.as_str(), Regex::new(&p.pattern)?)))
            .collect()
    }

    /// Whether `value` satisfies every pattern on `field`. Fields without
    /// patterns accept anything; patterns that fail to compile reject.
    pub fn accepts(&self, field: &str, value: &str) -> bool {
        self.for_field(field).all(|p| {
            Regex::new(&p.pattern)
                .map(|re| re.is_match(value))
                .unwrap_or(false)
        })
    }
}
