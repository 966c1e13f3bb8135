//! Representation compilers. Each turns the resolved constraints targeting
//! its enforcement into one IR fragment, independently of the others.

pub mod grammar;
pub mod regex;
pub mod schema;
pub mod token_mask;

use tether_core::errors::CompileError;
use tether_core::{Constraint, Enforcement};

pub use self::grammar::GrammarCompiler;
pub use self::regex::RegexCompiler;
pub use self::schema::SchemaCompiler;
pub use self::token_mask::TokenMaskCompiler;

/// One compiler per enforcement representation.
pub trait RepresentationCompiler {
    type Fragment;

    /// The enforcement this compiler consumes.
    const TARGET: Enforcement;

    /// Compile the constraints (already in resolved order) that target
    /// [`Self::TARGET`]. Returns `Ok(None)` when none do.
    fn compile(&self, constraints: &[&Constraint]) -> Result<Option<Self::Fragment>, CompileError>;

    /// The subset of `constraints` this compiler is responsible for.
    fn targeted<'a>(constraints: &[&'a Constraint]) -> Vec<&'a Constraint> {
        constraints
            .iter()
            .copied()
            .filter(|c| c.enforcement == Self::TARGET)
            .collect()
    }
}
