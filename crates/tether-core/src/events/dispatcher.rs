//! EventDispatcher: synchronous fan-out to registered handlers.

use std::sync::Arc;

use super::handler::TetherEventHandler;
use super::types::*;

/// Synchronous event dispatcher wrapping a list of handlers.
///
/// With no handlers registered, every `emit_*` is an empty loop.
#[derive(Default, Clone)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn TetherEventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn TetherEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Handlers that panic are logged and skipped; later handlers still run.
    fn emit<F: Fn(&dyn TetherEventHandler)>(&self, event: &'static str, f: F) {
        for handler in &self.handlers {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                f(handler.as_ref());
            }));
            if result.is_err() {
                tracing::warn!(event, "event handler panicked");
            }
        }
    }

    // ---- Compilation ----
    pub fn emit_compilation_started(&self, event: &CompilationStartedEvent) {
        self.emit("compilation_started", |h| h.on_compilation_started(event));
    }

    pub fn emit_compilation_finished(&self, event: &CompilationFinishedEvent) {
        self.emit("compilation_finished", |h| h.on_compilation_finished(event));
    }

    pub fn emit_compilation_failed(&self, event: &CompilationFailedEvent) {
        self.emit("compilation_failed", |h| h.on_compilation_failed(event));
    }

    pub fn emit_conflict_resolved(&self, event: &ConflictResolvedEvent) {
        self.emit("conflict_resolved", |h| h.on_conflict_resolved(event));
    }

    // ---- Dispatch ----
    pub fn emit_dispatch_retry(&self, event: &DispatchRetryEvent) {
        self.emit("dispatch_retry", |h| h.on_dispatch_retry(event));
    }

    pub fn emit_dispatch_finished(&self, event: &DispatchFinishedEvent) {
        self.emit("dispatch_finished", |h| h.on_dispatch_finished(event));
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
