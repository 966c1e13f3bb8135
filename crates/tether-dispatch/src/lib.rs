//! # tether-dispatch
//!
//! Sends a prompt and its compiled [`ConstraintIR`](tether_core::ConstraintIR)
//! to a [`GenerationBackend`], with bounded retries, backoff, a deadline and
//! a concurrency pool. [`Orchestrator`] puts the cache in front of it.

pub mod backend;
pub mod dispatcher;
pub mod orchestrator;
pub mod retry;

pub use backend::{
    BackendRequest, BackendResponse, GenerationBackend, GenerationParams, ResponseMetadata,
};
pub use dispatcher::{
    Classification, DispatchProvenance, DispatchRequest, DispatchResult, Dispatcher,
    GeneratedOutput,
};
pub use orchestrator::Orchestrator;
pub use retry::RetryPolicy;
