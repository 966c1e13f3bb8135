//! TetherEventHandler trait, all methods with no-op defaults.

use super::types::*;

/// Trait for observing Tether lifecycle events.
///
/// Handlers override only the events they care about. `Send + Sync` so one
/// handler can be shared between compile threads and dispatch tasks.
pub trait TetherEventHandler: Send + Sync {
    // ---- Compilation ----
    fn on_compilation_started(&self, _event: &CompilationStartedEvent) {}
    fn on_compilation_finished(&self, _event: &CompilationFinishedEvent) {}
    fn on_compilation_failed(&self, _event: &CompilationFailedEvent) {}
    fn on_conflict_resolved(&self, _event: &ConflictResolvedEvent) {}

    // ---- Dispatch ----
    fn on_dispatch_retry(&self, _event: &DispatchRetryEvent) {}
    fn on_dispatch_finished(&self, _event: &DispatchFinishedEvent) {}
}
