//! Dependency/conflict graph over a constraint set, and its resolution.

pub mod builder;
pub mod resolver;

pub use builder::ConstraintGraph;
pub use resolver::{resolve, ResolvedConstraints};
