//! Event payload types.

use crate::fingerprint::Fingerprint;

/// Payload for `on_compilation_started`.
#[derive(Debug, Clone)]
pub struct CompilationStartedEvent {
    pub fingerprint: Fingerprint,
    pub constraint_count: usize,
}

/// Payload for `on_compilation_finished`.
#[derive(Debug, Clone)]
pub struct CompilationFinishedEvent {
    pub fingerprint: Fingerprint,
    pub fragment_count: usize,
    pub advisory_count: usize,
    pub duration_ms: u64,
}

/// Payload for `on_compilation_failed`.
#[derive(Debug, Clone)]
pub struct CompilationFailedEvent {
    pub fingerprint: Fingerprint,
    pub error_code: &'static str,
    pub message: String,
}

/// Payload for `on_conflict_resolved`.
#[derive(Debug, Clone)]
pub struct ConflictResolvedEvent {
    pub kept: String,
    pub demoted: String,
}

/// Payload for `on_dispatch_retry`.
#[derive(Debug, Clone)]
pub struct DispatchRetryEvent {
    pub request_id: String,
    pub fingerprint: Fingerprint,
    /// The attempt that failed, starting at 1.
    pub attempt: u32,
    pub delay_ms: u64,
    pub error: String,
}

/// Payload for `on_dispatch_finished`.
#[derive(Debug, Clone)]
pub struct DispatchFinishedEvent {
    pub request_id: String,
    pub fingerprint: Fingerprint,
    pub success: bool,
    pub retry_count: u32,
    pub latency_ms: u64,
}
