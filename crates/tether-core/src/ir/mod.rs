//! ConstraintIR: the compiled, backend-agnostic bundle of enforcement
//! fragments.

pub mod grammar;
pub mod regex_set;
pub mod schema;
pub mod token_mask;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constraint::Priority;
use crate::fingerprint::Fingerprint;

pub use grammar::{GrammarFragment, GrammarRule};
pub use regex_set::{NamedPattern, RegexFragment};
pub use schema::{SchemaField, SchemaFragment, SchemaType};
pub use token_mask::{MaskEvaluator, MaskRule, MaskVerdict, TokenMaskFragment};

const DIGEST_DOMAIN: &[u8] = b"tether.constraint-ir.v1";

/// Why a constraint ended up as metadata instead of being enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AdvisoryReason {
    /// Declared with `advisory` enforcement.
    Declared,
    /// Lost a conflict against a higher-priority constraint.
    ConflictDemoted { winner: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryEntry {
    pub constraint_id: String,
    pub priority: Priority,
    #[serde(flatten)]
    pub reason: AdvisoryReason,
}

/// Non-fatal facts recorded while compiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "note", rename_all = "snake_case")]
pub enum CompilationNote {
    ConflictResolved {
        kept: String,
        demoted: String,
        kept_priority: Priority,
        demoted_priority: Priority,
    },
}

/// The compiled artifact for one constraint set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintIR {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaFragment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grammar: Option<GrammarFragment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex_set: Option<RegexFragment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_mask_rules: Option<TokenMaskFragment>,
    #[serde(default)]
    pub advisory: Vec<AdvisoryEntry>,
    #[serde(default)]
    pub notes: Vec<CompilationNote>,
    pub source_fingerprint: Fingerprint,
    pub compiled_at: DateTime<Utc>,
}

/// Everything that defines an IR's content. `compiled_at` is excluded so that
/// two compilations of the same set digest identically.
#[derive(Serialize)]
struct DigestView<'a> {
    schema: &'a Option<SchemaFragment>,
    grammar: &'a Option<GrammarFragment>,
    regex_set: &'a Option<RegexFragment>,
    token_mask_rules: &'a Option<TokenMaskFragment>,
    advisory: &'a [AdvisoryEntry],
    notes: &'a [CompilationNote],
    source_fingerprint: &'a Fingerprint,
}

impl ConstraintIR {
    /// An IR with no fragments for the given set fingerprint.
    pub fn empty(source_fingerprint: Fingerprint) -> Self {
        Self {
            schema: None,
            grammar: None,
            regex_set: None,
            token_mask_rules: None,
            advisory: Vec::new(),
            notes: Vec::new(),
            source_fingerprint,
            compiled_at: Utc::now(),
        }
    }

    /// Content hash over everything except `compiled_at`.
    pub fn content_digest(&self) -> Fingerprint {
        let view = DigestView {
            schema: &self.schema,
            grammar: &self.grammar,
            regex_set: &self.regex_set,
            token_mask_rules: &self.token_mask_rules,
            advisory: &self.advisory,
            notes: &self.notes,
            source_fingerprint: &self.source_fingerprint,
        };
        let bytes = serde_json::to_vec(&view).unwrap_or_default();
        let mut hasher = blake3::Hasher::new();
        hasher.update(DIGEST_DOMAIN);
        hasher.update(&bytes);
        Fingerprint::from(hasher.finalize())
    }

    /// Equality ignoring `compiled_at`.
    pub fn same_content(&self, other: &ConstraintIR) -> bool {
        self.content_digest() == other.content_digest()
    }

    /// Whether at least one enforcement fragment is present.
    pub fn has_enforcement(&self) -> bool {
        self.schema.is_some()
            || self.grammar.is_some()
            || self.regex_set.is_some()
            || self.token_mask_rules.is_some()
    }

    /// Number of fragments present (0 to 4).
    pub fn fragment_count(&self) -> usize {
        [
            self.schema.is_some(),
            self.grammar.is_some(),
            self.regex_set.is_some(),
            self.token_mask_rules.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }

    pub fn is_advisory(&self, constraint_id: &str) -> bool {
        self.advisory.iter().any(|a| a.constraint_id == constraint_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp() -> Fingerprint {
        Fingerprint::from(blake3::hash(b"set"))
    }

    #[test]
    fn digest_ignores_compiled_at() {
        let a = ConstraintIR::empty(fp());
        let mut b = a.clone();
        b.compiled_at = a.compiled_at + chrono::Duration::seconds(30);
        assert_eq!(a.content_digest(), b.content_digest());
        assert!(a.same_content(&b));
    }

    #[test]
    fn digest_covers_advisory_metadata() {
        let a = ConstraintIR::empty(fp());
        let mut b = a.clone();
        b.advisory.push(AdvisoryEntry {
            constraint_id: "x".into(),
            priority: Priority::Low,
            reason: AdvisoryReason::Declared,
        });
        assert_ne!(a.content_digest(), b.content_digest());
        assert!(b.is_advisory("x"));
    }

    #[test]
    fn empty_ir_has_no_fragments() {
        let ir = ConstraintIR::empty(fp());
        assert!(!ir.has_enforcement());
        assert_eq!(ir.fragment_count(), 0);
    }
}
