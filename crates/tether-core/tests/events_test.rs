//! Tests for the Tether event system.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tether_core::events::{
    CompilationFinishedEvent, CompilationStartedEvent, ConflictResolvedEvent, EventDispatcher,
    TetherEventHandler,
};
use tether_core::Fingerprint;

#[derive(Default)]
struct CountingHandler {
    started: AtomicUsize,
    finished: AtomicUsize,
}

impl TetherEventHandler for CountingHandler {
    fn on_compilation_started(&self, _event: &CompilationStartedEvent) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    fn on_compilation_finished(&self, _event: &CompilationFinishedEvent) {
        self.finished.fetch_add(1, Ordering::Relaxed);
    }
}

struct PanickingHandler;

impl TetherEventHandler for PanickingHandler {
    fn on_compilation_started(&self, _event: &CompilationStartedEvent) {
        panic!("handler failure");
    }
}

fn started() -> CompilationStartedEvent {
    CompilationStartedEvent {
        fingerprint: Fingerprint::from_bytes([1u8; 32]),
        constraint_count: 3,
    }
}

#[test]
fn handlers_receive_events() {
    let counter = Arc::new(CountingHandler::default());
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(counter.clone());

    dispatcher.emit_compilation_started(&started());
    dispatcher.emit_compilation_finished(&CompilationFinishedEvent {
        fingerprint: Fingerprint::from_bytes([1u8; 32]),
        fragment_count: 2,
        advisory_count: 0,
        duration_ms: 4,
    });
    // Not overridden: falls through to the no-op default.
    dispatcher.emit_conflict_resolved(&ConflictResolvedEvent {
        kept: "a".into(),
        demoted: "b".into(),
    });

    assert_eq!(counter.started.load(Ordering::Relaxed), 1);
    assert_eq!(counter.finished.load(Ordering::Relaxed), 1);
}

#[test]
fn panicking_handler_does_not_block_others() {
    let counter = Arc::new(CountingHandler::default());
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(Arc::new(PanickingHandler));
    dispatcher.register(counter.clone());
    assert_eq!(dispatcher.handler_count(), 2);

    dispatcher.emit_compilation_started(&started());
    assert_eq!(counter.started.load(Ordering::Relaxed), 1);
}

#[test]
fn empty_dispatcher_is_a_no_op() {
    EventDispatcher::new().emit_compilation_started(&started());
}
