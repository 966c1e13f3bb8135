//! Constraint model: the read-only input of the engine.
//!
//! Constraints are produced by external extractors or declaration sources and
//! handed to the compiler per call. Nothing here mutates a constraint once
//! built; the builder methods consume and return `Self`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// What a constraint is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    Syntactic,
    TypeSafety,
    Semantic,
    Architectural,
    Operational,
    Security,
}

impl ConstraintKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Syntactic => "syntactic",
            Self::TypeSafety => "type_safety",
            Self::Semantic => "semantic",
            Self::Architectural => "architectural",
            Self::Operational => "operational",
            Self::Security => "security",
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Constraint priority. Declaration order is the ordering:
/// `Optional < Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Optional,
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Optional => "optional",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Info,
    Hint,
}

/// Which representation enforces a constraint during decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Enforcement {
    Schema,
    Grammar,
    Regex,
    TokenMask,
    /// Carried as metadata only; no compiler consumes it.
    #[serde(alias = "advisory_only")]
    Advisory,
}

impl Enforcement {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Grammar => "grammar",
            Self::Regex => "regex",
            Self::TokenMask => "token_mask",
            Self::Advisory => "advisory",
        }
    }

    /// Whether a payload variant can be enforced by this representation.
    pub fn accepts(&self, spec: &PatternSpec) -> bool {
        matches!(
            (self, spec),
            (Self::Schema, PatternSpec::Field { .. })
                | (Self::Grammar, PatternSpec::Production { .. })
                | (Self::Regex, PatternSpec::Regex { .. })
                | (Self::TokenMask, PatternSpec::TokenRule { .. })
                | (Self::Advisory, _)
        )
    }
}

impl fmt::Display for Enforcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a constraint came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvenanceSource {
    #[default]
    StaticAnalysis,
    Declaration,
    Semantic,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Provenance {
    pub source: ProvenanceSource,
    /// Free-form origin (file path, rule name, model id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

/// Value type of a schema field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Null,
    Array {
        items: Box<FieldType>,
    },
    /// Nested sub-schema.
    Object {
        #[serde(default)]
        fields: BTreeMap<String, FieldSpec>,
    },
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Array { .. } => "array",
            Self::Object { .. } => "object",
        }
    }
}

/// A field inside a nested sub-schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "field_type")]
    pub ty: FieldType,
    #[serde(default)]
    pub optional: bool,
}

/// One symbol on the right-hand side of a grammar production.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrammarSymbol {
    /// A literal, emitted verbatim. Must be non-empty.
    Terminal(String),
    /// Reference to another rule.
    Rule(String),
}

impl GrammarSymbol {
    pub fn terminal(s: impl Into<String>) -> Self {
        Self::Terminal(s.into())
    }

    pub fn rule(s: impl Into<String>) -> Self {
        Self::Rule(s.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskAction {
    Allow,
    Deny,
}

/// Selects symbols of the decoding vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolMatcher {
    /// Exact membership in a literal set.
    Literals(BTreeSet<String>),
    Prefix(String),
    /// Regular expression matched against the whole symbol.
    Pattern(String),
}

/// Kind-dependent payload of a constraint (`pattern_or_spec`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatternSpec {
    /// Typed field declaration. Dotted paths nest: `billing.amount`.
    Field {
        field: String,
        field_type: FieldType,
        #[serde(default)]
        optional: bool,
    },
    /// Grammar production. An empty alternative derives the empty string.
    Production {
        rule: String,
        alternatives: Vec<Vec<GrammarSymbol>>,
        /// Schema field whose value this rule generates.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },
    /// Format pattern for a named field.
    Regex { field: String, pattern: String },
    /// Direct allow/deny rule over vocabulary symbols.
    TokenRule {
        action: MaskAction,
        matcher: SymbolMatcher,
    },
    /// Free-form description for advisory constraints.
    Text { description: String },
}

fn default_confidence() -> f64 {
    1.0
}

/// A single declarative rule to be enforced on generated output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub id: String,
    pub kind: ConstraintKind,
    pub priority: Priority,
    #[serde(default)]
    pub severity: Severity,
    pub enforcement: Enforcement,
    #[serde(rename = "pattern_or_spec", alias = "spec")]
    pub spec: PatternSpec,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub provenance: Provenance,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub conflicts_with: BTreeSet<String>,
}

impl Constraint {
    pub fn new(
        id: impl Into<String>,
        kind: ConstraintKind,
        priority: Priority,
        enforcement: Enforcement,
        spec: PatternSpec,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            priority,
            severity: Severity::default(),
            enforcement,
            spec,
            confidence: default_confidence(),
            provenance: Provenance::default(),
            depends_on: BTreeSet::new(),
            conflicts_with: BTreeSet::new(),
        }
    }

    /// Schema constraint on a single (possibly dotted) field.
    pub fn field(id: impl Into<String>, priority: Priority, field: &str, ty: FieldType) -> Self {
        Self::new(
            id,
            ConstraintKind::TypeSafety,
            priority,
            Enforcement::Schema,
            PatternSpec::Field {
                field: field.to_string(),
                field_type: ty,
                optional: false,
            },
        )
    }

    /// Regex constraint on a named field.
    pub fn regex(id: impl Into<String>, priority: Priority, field: &str, pattern: &str) -> Self {
        Self::new(
            id,
            ConstraintKind::Syntactic,
            priority,
            Enforcement::Regex,
            PatternSpec::Regex {
                field: field.to_string(),
                pattern: pattern.to_string(),
            },
        )
    }

    /// Grammar production constraint.
    pub fn production(
        id: impl Into<String>,
        priority: Priority,
        rule: &str,
        alternatives: Vec<Vec<GrammarSymbol>>,
    ) -> Self {
        Self::new(
            id,
            ConstraintKind::Syntactic,
            priority,
            Enforcement::Grammar,
            PatternSpec::Production {
                rule: rule.to_string(),
                alternatives,
                field: None,
            },
        )
    }

    /// Token-mask constraint.
    pub fn token_rule(
        id: impl Into<String>,
        priority: Priority,
        action: MaskAction,
        matcher: SymbolMatcher,
    ) -> Self {
        Self::new(
            id,
            ConstraintKind::Security,
            priority,
            Enforcement::TokenMask,
            PatternSpec::TokenRule { action, matcher },
        )
    }

    /// Advisory-only constraint carrying a description.
    pub fn advisory(id: impl Into<String>, priority: Priority, description: &str) -> Self {
        Self::new(
            id,
            ConstraintKind::Semantic,
            priority,
            Enforcement::Advisory,
            PatternSpec::Text {
                description: description.to_string(),
            },
        )
    }

    pub fn with_kind(mut self, kind: ConstraintKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Bind a grammar production to a schema field. No-op for other payloads.
    pub fn bound_to_field(mut self, name: &str) -> Self {
        if let PatternSpec::Production { ref mut field, .. } = self.spec {
            *field = Some(name.to_string());
        }
        self
    }

    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.depends_on.insert(id.into());
        self
    }

    pub fn conflicts_with(mut self, id: impl Into<String>) -> Self {
        self.conflicts_with.insert(id.into());
        self
    }

    /// Whether any compiler enforces this constraint.
    pub fn is_enforced(&self) -> bool {
        self.enforcement != Enforcement::Advisory
    }
}
