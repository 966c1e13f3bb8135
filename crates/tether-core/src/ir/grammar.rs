//! Grammar fragment: EBNF-style production rules.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::constraint::GrammarSymbol;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarRule {
    /// Alternatives in first-declared order. An empty alternative is ε.
    pub alternatives: Vec<Vec<GrammarSymbol>>,
    /// Schema field whose value this rule generates, if bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub source_ids: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GrammarFragment {
    pub rules: BTreeMap<String, GrammarRule>,
}

impl GrammarFragment {
    /// Rules not referenced by any other rule; generation starts from these.
    pub fn roots(&self) -> Vec<&str> {
        let referenced: BTreeSet<&str> = self
            .rules
            .iter()
            .flat_map(|(name, rule)| {
                rule.alternatives
                    .iter()
                    .flatten()
                    .filter_map(move |sym| match sym {
                        GrammarSymbol::Rule(r) if r != name => Some(r.as_str()),
                        _ => None,
                    })
            })
            .collect();
        self.rules
            .keys()
            .map(String::as_str)
            .filter(|name| !referenced.contains(name))
            .collect()
    }

    /// Every terminal literal the grammar can emit.
    pub fn terminals(&self) -> BTreeSet<&str> {
        self.rules
            .values()
            .flat_map(|rule| rule.alternatives.iter().flatten())
            .filter_map(|sym| match sym {
                GrammarSymbol::Terminal(t) => Some(t.as_str()),
                GrammarSymbol::Rule(_) => None,
            })
            .collect()
    }

    /// Rules bound to a schema field, as `(field, rule name, rule)`.
    pub fn bound_fields(&self) -> impl Iterator<Item = (&str, &str, &GrammarRule)> {
        self.rules.iter().filter_map(|(name, rule)| {
            rule.field
                .as_deref()
                .map(|field| (field, name.as_str(), rule))
        })
    }

    /// The full set of strings `rule` derives, if it is finite and has at
    /// most `limit` members. Recursive or oversized languages yield `None`.
    pub fn finite_language(&self, rule: &str, limit: usize) -> Option<BTreeSet<String>> {
        let mut stack = Vec::new();
        self.expand(rule, limit, &mut stack)
    }

    fn expand<'a>(
        &'a self,
        name: &'a str,
        limit: usize,
        stack: &mut Vec<&'a str>,
    ) -> Option<BTreeSet<String>> {
        if stack.contains(&name) {
            return None;
        }
        let rule = self.rules.get(name)?;
        stack.push(name);

        let mut language = BTreeSet::new();
        for alternative in &rule.alternatives {
            let mut partial = BTreeSet::from([String::new()]);
            for symbol in alternative {
                let pieces = match symbol {
                    GrammarSymbol::Terminal(t) => BTreeSet::from([t.clone()]),
                    GrammarSymbol::Rule(r) => self.expand(r, limit, stack)?,
                };
                let mut next = BTreeSet::new();
                for prefix in &partial {
                    for piece in &pieces {
                        next.insert(format!("{prefix}{piece}"));
                        if next.len() > limit {
                            return None;
                        }
                    }
                }
                partial = next;
            }
            language.extend(partial);
            if language.len() > limit {
                return None;
            }
        }

        stack.pop();
        Some(language)
    }

    /// Render as EBNF text: `rule ::= "lit" other | ε ;` per line, roots first.
    pub fn to_ebnf(&self) -> String {
        let roots = self.roots();
        let ordered = roots.iter().copied().chain(
            self.rules
                .keys()
                .map(String::as_str)
                .filter(|name| !roots.contains(name)),
        );

        let mut out = String::new();
        for name in ordered {
            let rule = &self.rules[name];
            let body: Vec<String> = rule
                .alternatives
                .iter()
                .map(|alt| {
                    if alt.is_empty() {
                        "\"\"".to_string()
                    } else {
                        alt.iter().map(render_symbol).collect::<Vec<_>>().join(" ")
                    }
                })
                .collect();
            let _ = writeln!(out, "{name} ::= {} ;", body.join(" | "));
        }
        out
    }
}

fn render_symbol(symbol: &GrammarSymbol) -> String {
    match symbol {
        GrammarSymbol::Terminal(t) => {
            let escaped = t.replace('\\', "\\\\").replace('"', "\\\"");
            format!("\"{escaped}\"")
        }
        GrammarSymbol::Rule(r) => r.clone(),
    }
}
