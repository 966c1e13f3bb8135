//! IR assembly and cross-fragment validation.

use std::collections::BTreeSet;

use chrono::Utc;
use regex::Regex;

use tether_core::errors::CompileError;
use tether_core::ir::{
    GrammarFragment, MaskVerdict, RegexFragment, SchemaFragment, TokenMaskFragment,
};
use tether_core::{ConstraintIR, Fingerprint, GrammarSymbol};

use crate::graph::ResolvedConstraints;

/// The four optional fragments produced by the representation compilers.
#[derive(Debug, Clone, Default)]
pub struct Fragments {
    pub schema: Option<SchemaFragment>,
    pub grammar: Option<GrammarFragment>,
    pub regex_set: Option<RegexFragment>,
    pub token_mask: Option<TokenMaskFragment>,
}

/// Merges fragments into one [`ConstraintIR`] and rejects combinations that
/// could never be satisfied together.
#[derive(Debug, Clone, Copy)]
pub struct IrAssembler {
    /// Bound grammar rules with larger (or infinite) languages are not
    /// cross-checked against the schema and regex fragments.
    max_expansion: usize,
}

impl IrAssembler {
    pub fn new(max_expansion: usize) -> Self {
        Self { max_expansion }
    }

    pub fn assemble(
        &self,
        resolved: ResolvedConstraints<'_>,
        fragments: Fragments,
        source_fingerprint: Fingerprint,
    ) -> Result<ConstraintIR, CompileError> {
        self.validate(&fragments)?;

        Ok(ConstraintIR {
            schema: fragments.schema,
            grammar: fragments.grammar,
            regex_set: fragments.regex_set,
            token_mask_rules: fragments.token_mask,
            advisory: resolved.advisory,
            notes: resolved.notes,
            source_fingerprint,
            compiled_at: Utc::now(),
        })
    }

    pub fn validate(&self, fragments: &Fragments) -> Result<(), CompileError> {
        if let (Some(schema), Some(regex_set)) = (&fragments.schema, &fragments.regex_set) {
            check_regex_fields(schema, regex_set)?;
        }
        if let Some(grammar) = &fragments.grammar {
            if let Some(schema) = &fragments.schema {
                self.check_grammar_against_schema(grammar, schema)?;
            }
            if let Some(regex_set) = &fragments.regex_set {
                self.check_grammar_against_regex(grammar, regex_set)?;
            }
            if let Some(mask) = &fragments.token_mask {
                check_grammar_against_mask(grammar, mask)?;
            }
        }
        Ok(())
    }

    fn check_grammar_against_schema(
        &self,
        grammar: &GrammarFragment,
        schema: &SchemaFragment,
    ) -> Result<(), CompileError> {
        for (field, name, rule) in grammar.bound_fields() {
            let Some(declared) = schema.lookup(field) else {
                return Err(inconsistent(
                    rule.source_ids.iter(),
                    format!(
                        "rule `{name}` generates field `{field}`, which the schema does not declare"
                    ),
                ));
            };
            let Some(language) = grammar.finite_language(name, self.max_expansion) else {
                continue;
            };
            if let Some(value) = language.iter().find(|v| !declared.ty.admits_literal(v)) {
                return Err(inconsistent(
                    rule.source_ids.iter().chain(&declared.source_ids),
                    format!(
                        "rule `{name}` derives {value:?}, which is not a valid {} for field \
                         `{field}`",
                        declared.ty.name()
                    ),
                ));
            }
        }
        Ok(())
    }

    fn check_grammar_against_regex(
        &self,
        grammar: &GrammarFragment,
        regex_set: &RegexFragment,
    ) -> Result<(), CompileError> {
        for (field, name, rule) in grammar.bound_fields() {
            let patterns: Vec<_> = regex_set.for_field(field).collect();
            if patterns.is_empty() {
                continue;
            }
            let Some(language) = grammar.finite_language(name, self.max_expansion) else {
                continue;
            };
            for pattern in patterns {
                let re = Regex::new(&pattern.pattern).map_err(|e| CompileError::InvalidPattern {
                    constraint_id: pattern.source_id.clone(),
                    pattern: pattern.pattern.clone(),
                    reason: e.to_string(),
                })?;
                if let Some(value) = language.iter().find(|v| !re.is_match(v)) {
                    return Err(inconsistent(
                        rule.source_ids.iter().chain(std::iter::once(&pattern.source_id)),
                        format!(
                            "rule `{name}` derives {value:?}, which field `{field}` pattern {} \
                             rejects",
                            pattern.pattern
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn check_regex_fields(
    schema: &SchemaFragment,
    regex_set: &RegexFragment,
) -> Result<(), CompileError> {
    match regex_set.patterns.iter().find(|p| schema.lookup(&p.name).is_none()) {
        Some(p) => Err(inconsistent(
            std::iter::once(&p.source_id),
            format!("pattern targets field `{}`, which the schema does not declare", p.name),
        )),
        None => Ok(()),
    }
}

fn check_grammar_against_mask(
    grammar: &GrammarFragment,
    mask: &TokenMaskFragment,
) -> Result<(), CompileError> {
    let evaluator = mask.evaluator().map_err(|e| CompileError::InconsistentIR {
        constraint_ids: mask.rules.iter().map(|r| r.source_id.clone()).collect(),
        reason: format!("token mask does not compile: {e}"),
    })?;

    for (name, rule) in &grammar.rules {
        for symbol in rule.alternatives.iter().flatten() {
            let GrammarSymbol::Terminal(terminal) = symbol else {
                continue;
            };
            let blocker = match evaluator.verdict(terminal) {
                MaskVerdict::Permitted => continue,
                MaskVerdict::DeniedBy(id) | MaskVerdict::NotAllowedBy(id) => id,
            };
            return Err(inconsistent(
                rule.source_ids.iter().chain(std::iter::once(&blocker)),
                format!(
                    "rule `{name}` requires terminal {terminal:?}, which the token mask forbids"
                ),
            ));
        }
    }
    Ok(())
}

fn inconsistent<'a>(ids: impl Iterator<Item = &'a String>, reason: String) -> CompileError {
    let ids: BTreeSet<&String> = ids.collect();
    CompileError::InconsistentIR {
        constraint_ids: ids.into_iter().cloned().collect(),
        reason,
    }
}
