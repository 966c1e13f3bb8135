//! # tether-core
//!
//! Foundation crate for the Tether constraint engine.
//! Defines the constraint model, the compiled IR, errors, config, events and
//! tracing setup. Every other crate in the workspace depends on this.

pub mod config;
pub mod constraint;
pub mod errors;
pub mod events;
pub mod fingerprint;
pub mod ir;
pub mod set;
pub mod tracing;

// Re-export the most commonly used types at the crate root.
pub use config::TetherConfig;
pub use constraint::{
    Constraint, ConstraintKind, Enforcement, FieldType, GrammarSymbol, MaskAction, PatternSpec,
    Priority, Provenance, ProvenanceSource, Severity, SymbolMatcher,
};
pub use errors::{CacheError, CompileError, ConfigError, DispatchError, TetherError};
pub use fingerprint::Fingerprint;
pub use ir::ConstraintIR;
pub use set::ConstraintSet;
