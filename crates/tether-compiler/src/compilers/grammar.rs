//! Grammar compiler: productions → a rule set proven unambiguous.
//!
//! Productions for the same rule merge (alternatives unioned in first-seen
//! order). The merged grammar is then checked to be LL(1) over characters:
//! every rule can be expanded by looking at one character of input, which
//! rules out ambiguity.

use std::collections::{BTreeMap, BTreeSet};

use tether_core::errors::CompileError;
use tether_core::ir::{GrammarFragment, GrammarRule};
use tether_core::{Constraint, Enforcement, GrammarSymbol, PatternSpec};

use super::RepresentationCompiler;

#[derive(Debug, Clone, Copy, Default)]
pub struct GrammarCompiler;

struct Alternative<'a> {
    symbols: &'a [GrammarSymbol],
    source_id: &'a str,
}

#[derive(Default)]
struct PendingRule<'a> {
    alternatives: Vec<Alternative<'a>>,
    /// Bound field and the constraint that bound it.
    field: Option<(&'a str, &'a str)>,
    source_ids: BTreeSet<String>,
}

/// End of input in FOLLOW sets.
type Lookahead = Option<char>;

impl RepresentationCompiler for GrammarCompiler {
    type Fragment = GrammarFragment;
    const TARGET: Enforcement = Enforcement::Grammar;

    fn compile(
        &self,
        constraints: &[&Constraint],
    ) -> Result<Option<GrammarFragment>, CompileError> {
        let targeted = Self::targeted(constraints);
        if targeted.is_empty() {
            return Ok(None);
        }

        let rules = merge_productions(&targeted)?;
        check_references(&rules)?;
        check_productive(&rules)?;
        Ll1Analysis::new(&rules).check(&rules)?;

        let rules = rules
            .into_iter()
            .map(|(name, pending)| {
                let rule = GrammarRule {
                    alternatives: pending
                        .alternatives
                        .iter()
                        .map(|alt| alt.symbols.to_vec())
                        .collect(),
                    field: pending.field.map(|(field, _)| field.to_string()),
                    source_ids: pending.source_ids,
                };
                (name.to_string(), rule)
            })
            .collect();
        Ok(Some(GrammarFragment { rules }))
    }
}

fn is_rule_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn merge_productions<'a>(
    constraints: &[&'a Constraint],
) -> Result<BTreeMap<&'a str, PendingRule<'a>>, CompileError> {
    let mut rules: BTreeMap<&str, PendingRule> = BTreeMap::new();

    for &c in constraints {
        let PatternSpec::Production {
            rule,
            alternatives,
            field,
        } = &c.spec
        else {
            return Err(CompileError::invalid(
                &c.id,
                "grammar constraint without a production payload",
            ));
        };

        if !is_rule_name(rule) {
            return Err(CompileError::invalid(&c.id, format!("invalid rule name `{rule}`")));
        }
        if alternatives.is_empty() {
            return Err(CompileError::invalid(&c.id, format!("rule `{rule}` has no alternatives")));
        }
        for symbol in alternatives.iter().flatten() {
            match symbol {
                GrammarSymbol::Terminal(t) if t.is_empty() => {
                    return Err(CompileError::invalid(&c.id, "empty terminal"));
                }
                GrammarSymbol::Rule(r) if !is_rule_name(r) => {
                    return Err(CompileError::invalid(
                        &c.id,
                        format!("invalid rule reference `{r}`"),
                    ));
                }
                _ => {}
            }
        }

        let pending = rules.entry(rule.as_str()).or_default();
        for alt in alternatives {
            if !pending.alternatives.iter().any(|a| a.symbols == alt.as_slice()) {
                pending.alternatives.push(Alternative {
                    symbols: alt,
                    source_id: &c.id,
                });
            }
        }
        match (pending.field, field.as_deref()) {
            (Some((bound, bound_by)), Some(requested)) if bound != requested => {
                let mut ids = vec![bound_by.to_string(), c.id.clone()];
                ids.sort();
                return Err(CompileError::InconsistentIR {
                    constraint_ids: ids,
                    reason: format!("rule `{rule}` bound to both `{bound}` and `{requested}`"),
                });
            }
            (None, Some(requested)) => pending.field = Some((requested, &c.id)),
            _ => {}
        }
        pending.source_ids.insert(c.id.clone());
    }
    Ok(rules)
}

fn check_references(rules: &BTreeMap<&str, PendingRule>) -> Result<(), CompileError> {
    for (name, rule) in rules {
        for alt in &rule.alternatives {
            for symbol in alt.symbols {
                if let GrammarSymbol::Rule(r) = symbol {
                    if !rules.contains_key(r.as_str()) {
                        return Err(CompileError::invalid(
                            alt.source_id,
                            format!("rule `{name}` references undefined rule `{r}`"),
                        ));
                    }
                }
            }
        }
    }
    Ok(())
}

/// Every rule must derive at least one finite string.
fn check_productive(rules: &BTreeMap<&str, PendingRule>) -> Result<(), CompileError> {
    let mut productive: BTreeSet<&str> = BTreeSet::new();
    loop {
        let before = productive.len();
        for (&name, rule) in rules {
            if productive.contains(name) {
                continue;
            }
            let derives = rule.alternatives.iter().any(|alt| {
                alt.symbols.iter().all(|s| match s {
                    GrammarSymbol::Terminal(_) => true,
                    GrammarSymbol::Rule(r) => productive.contains(r.as_str()),
                })
            });
            if derives {
                productive.insert(name);
            }
        }
        if productive.len() == before {
            break;
        }
    }

    match rules.iter().find(|(name, _)| !productive.contains(*name)) {
        Some((name, rule)) => {
            let id = rule.source_ids.iter().next().map(String::as_str).unwrap_or(name);
            Err(CompileError::invalid(
                id,
                format!("rule `{name}` never derives a finite string"),
            ))
        }
        None => Ok(()),
    }
}

struct Ll1Analysis<'a> {
    nullable: BTreeSet<&'a str>,
    first: BTreeMap<&'a str, BTreeSet<char>>,
    follow: BTreeMap<&'a str, BTreeSet<Lookahead>>,
}

impl<'a> Ll1Analysis<'a> {
    fn new(rules: &BTreeMap<&'a str, PendingRule<'a>>) -> Self {
        let mut analysis = Self {
            nullable: BTreeSet::new(),
            first: rules.keys().map(|&name| (name, BTreeSet::new())).collect(),
            follow: rules.keys().map(|&name| (name, BTreeSet::new())).collect(),
        };
        analysis.compute_nullable_and_first(rules);
        analysis.compute_follow(rules);
        analysis
    }

    fn compute_nullable_and_first(&mut self, rules: &BTreeMap<&'a str, PendingRule<'a>>) {
        let mut changed = true;
        while changed {
            changed = false;
            for (&name, rule) in rules {
                for alt in &rule.alternatives {
                    let (first, nullable) = self.first_of(alt.symbols);
                    if nullable && self.nullable.insert(name) {
                        changed = true;
                    }
                    if let Some(set) = self.first.get_mut(name) {
                        let size = set.len();
                        set.extend(first);
                        changed |= set.len() != size;
                    }
                }
            }
        }
    }

    fn compute_follow(&mut self, rules: &BTreeMap<&'a str, PendingRule<'a>>) {
        // Entry points: unreferenced rules and rules generating a field value.
        let referenced: BTreeSet<&str> = rules
            .iter()
            .flat_map(|(&name, rule)| {
                rule.alternatives.iter().flat_map(|a| a.symbols).filter_map(move |s| match s {
                    GrammarSymbol::Rule(r) if r.as_str() != name => Some(r.as_str()),
                    _ => None,
                })
            })
            .collect();
        let mut entries: Vec<&str> = rules
            .iter()
            .filter(|(name, rule)| !referenced.contains(*name) || rule.field.is_some())
            .map(|(name, _)| *name)
            .collect();
        if entries.is_empty() {
            entries = rules.keys().copied().collect();
        }
        for name in entries {
            if let Some(set) = self.follow.get_mut(name) {
                set.insert(None);
            }
        }

        let mut changed = true;
        while changed {
            changed = false;
            for (&name, rule) in rules {
                for alt in &rule.alternatives {
                    for (i, symbol) in alt.symbols.iter().enumerate() {
                        let GrammarSymbol::Rule(target) = symbol else {
                            continue;
                        };
                        let (rest_first, rest_nullable) = self.first_of(&alt.symbols[i + 1..]);
                        let mut additions: BTreeSet<Lookahead> =
                            rest_first.into_iter().map(Some).collect();
                        if rest_nullable {
                            additions.extend(self.follow.get(name).into_iter().flatten().copied());
                        }
                        if let Some(set) = self.follow.get_mut(target.as_str()) {
                            let size = set.len();
                            set.extend(additions);
                            changed |= set.len() != size;
                        }
                    }
                }
            }
        }
    }

    /// FIRST set of a symbol sequence and whether it can derive "".
    fn first_of(&self, symbols: &[GrammarSymbol]) -> (BTreeSet<char>, bool) {
        let mut out = BTreeSet::new();
        for symbol in symbols {
            match symbol {
                GrammarSymbol::Terminal(t) => {
                    out.extend(t.chars().next());
                    return (out, false);
                }
                GrammarSymbol::Rule(r) => {
                    out.extend(self.first.get(r.as_str()).into_iter().flatten().copied());
                    if !self.nullable.contains(r.as_str()) {
                        return (out, false);
                    }
                }
            }
        }
        (out, true)
    }

    fn check(&self, rules: &BTreeMap<&'a str, PendingRule<'a>>) -> Result<(), CompileError> {
        for (&name, rule) in rules {
            let firsts: Vec<(BTreeSet<char>, bool)> = rule
                .alternatives
                .iter()
                .map(|alt| self.first_of(alt.symbols))
                .collect();

            for i in 0..firsts.len() {
                for j in i + 1..firsts.len() {
                    if let Some(c) = firsts[i].0.intersection(&firsts[j].0).next() {
                        return Err(ambiguous(
                            name,
                            &[&rule.alternatives[i], &rule.alternatives[j]],
                            format!(
                                "alternatives {} and {} can both start with {c:?}",
                                render(rule.alternatives[i].symbols),
                                render(rule.alternatives[j].symbols),
                            ),
                        ));
                    }
                }
            }

            let nullable: Vec<usize> = (0..firsts.len()).filter(|&i| firsts[i].1).collect();
            if nullable.len() > 1 {
                let alts: Vec<&Alternative> =
                    nullable.iter().map(|&i| &rule.alternatives[i]).collect();
                return Err(ambiguous(
                    name,
                    &alts,
                    "more than one alternative derives the empty string".to_string(),
                ));
            }

            if let Some(&empty) = nullable.first() {
                let follow = &self.follow[name];
                for (j, (first, _)) in firsts.iter().enumerate() {
                    if j == empty {
                        continue;
                    }
                    if let Some(c) = first.iter().find(|c| follow.contains(&Some(**c))) {
                        return Err(ambiguous(
                            name,
                            &[&rule.alternatives[empty], &rule.alternatives[j]],
                            format!(
                                "alternative {} starts with {c:?}, which can also follow `{name}`",
                                render(rule.alternatives[j].symbols),
                            ),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

fn ambiguous(rule: &str, alternatives: &[&Alternative], reason: String) -> CompileError {
    let ids: BTreeSet<&str> = alternatives.iter().map(|a| a.source_id).collect();
    CompileError::AmbiguousGrammar {
        rule: rule.to_string(),
        constraint_ids: ids.into_iter().map(str::to_string).collect(),
        reason,
    }
}

fn render(symbols: &[GrammarSymbol]) -> String {
    if symbols.is_empty() {
        return "\"\"".to_string();
    }
    symbols
        .iter()
        .map(|s| match s {
            GrammarSymbol::Terminal(t) => format!("{t:?}"),
            GrammarSymbol::Rule(r) => r.clone(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
