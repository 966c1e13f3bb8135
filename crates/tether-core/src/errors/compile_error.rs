//! Compilation errors: graph building, resolution, representation compilers
//! and IR assembly. None of these are ever downgraded; they abort compilation.

use super::error_code::{self, TetherErrorCode};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("constraint {constraint_id} references unknown constraint {missing_id}")]
    DanglingReference {
        constraint_id: String,
        missing_id: String,
    },

    #[error("invalid constraint {constraint_id}: {reason}")]
    InvalidConstraint {
        constraint_id: String,
        reason: String,
    },

    #[error("dependency cycle among constraints [{}]", .ids.join(", "))]
    DependencyCycle { ids: Vec<String> },

    #[error("unresolvable conflict between {a} and {b}: both have priority {priority}")]
    UnresolvableConflict {
        a: String,
        b: String,
        priority: String,
    },

    #[error(
        "ambiguous grammar in rule {rule} (constraints [{}]): {reason}",
        .constraint_ids.join(", ")
    )]
    AmbiguousGrammar {
        rule: String,
        constraint_ids: Vec<String>,
        reason: String,
    },

    #[error("invalid pattern in constraint {constraint_id} ({pattern}): {reason}")]
    InvalidPattern {
        constraint_id: String,
        pattern: String,
        reason: String,
    },

    #[error("inconsistent IR (constraints [{}]): {reason}", .constraint_ids.join(", "))]
    InconsistentIR {
        constraint_ids: Vec<String>,
        reason: String,
    },
}

impl CompileError {
    /// Ids of the constraints the error is about.
    pub fn constraint_ids(&self) -> Vec<&str> {
        match self {
            Self::DanglingReference { constraint_id, .. } => vec![constraint_id.as_str()],
            Self::InvalidConstraint { constraint_id, .. } => vec![constraint_id.as_str()],
            Self::DependencyCycle { ids } => ids.iter().map(String::as_str).collect(),
            Self::UnresolvableConflict { a, b, .. } => vec![a.as_str(), b.as_str()],
            Self::AmbiguousGrammar { constraint_ids, .. } => {
                constraint_ids.iter().map(String::as_str).collect()
            }
            Self::InvalidPattern { constraint_id, .. } => vec![constraint_id.as_str()],
            Self::InconsistentIR { constraint_ids, .. } => {
                constraint_ids.iter().map(String::as_str).collect()
            }
        }
    }

    pub fn invalid(constraint_id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidConstraint {
            constraint_id: constraint_id.to_string(),
            reason: reason.into(),
        }
    }
}

impl TetherErrorCode for CompileError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::DanglingReference { .. } => error_code::DANGLING_REFERENCE,
            Self::InvalidConstraint { .. } => error_code::INVALID_CONSTRAINT,
            Self::DependencyCycle { .. } => error_code::DEPENDENCY_CYCLE,
            Self::UnresolvableConflict { .. } => error_code::UNRESOLVABLE_CONFLICT,
            Self::AmbiguousGrammar { .. } => error_code::AMBIGUOUS_GRAMMAR,
            Self::InvalidPattern { .. } => error_code::INVALID_PATTERN,
            Self::InconsistentIR { .. } => error_code::INCONSISTENT_IR,
        }
    }
}
