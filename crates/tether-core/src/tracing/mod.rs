//! Observability for Tether.
//! `tracing` with `EnvFilter`, per-crate log levels.

pub mod fields;
pub mod setup;

pub use setup::init_tracing;
