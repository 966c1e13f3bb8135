//! # tether-compiler
//!
//! Turns a [`ConstraintSet`] into a validated [`ConstraintIR`]:
//! graph building → resolution → representation compilers → assembly.
//! [`ArtifactCache`] serves compiled IRs by fingerprint.

pub mod assembler;
pub mod cache;
pub mod compilers;
pub mod graph;

use std::time::Instant;

use tether_core::config::CompilerConfig;
use tether_core::errors::{CompileError, TetherErrorCode};
use tether_core::events::{
    CompilationFailedEvent, CompilationFinishedEvent, CompilationStartedEvent,
    ConflictResolvedEvent, EventDispatcher,
};
use tether_core::ir::CompilationNote;
use tether_core::tracing::fields;
use tether_core::{ConstraintIR, ConstraintSet, Fingerprint};

pub use assembler::{Fragments, IrAssembler};
pub use cache::{ArtifactCache, CacheStats};
pub use compilers::{
    GrammarCompiler, RegexCompiler, RepresentationCompiler, SchemaCompiler, TokenMaskCompiler,
};
pub use graph::{resolve, ConstraintGraph, ResolvedConstraints};

/// Compilation pipeline. Stateless apart from configuration; safe to share
/// across threads and to call concurrently.
#[derive(Debug, Clone, Default)]
pub struct ConstraintCompiler {
    config: CompilerConfig,
    events: EventDispatcher,
}

impl ConstraintCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config,
            events: EventDispatcher::new(),
        }
    }

    pub fn with_events(mut self, events: EventDispatcher) -> Self {
        self.events = events;
        self
    }

    /// Compile a constraint set. Deterministic: the same set always yields
    /// an IR with the same content digest.
    pub fn compile(&self, set: &ConstraintSet) -> Result<ConstraintIR, CompileError> {
        let fingerprint = set.fingerprint();
        let span = tracing::info_span!(
            fields::SPAN_COMPILE,
            fingerprint = %fingerprint.short(),
            constraint_count = set.len()
        );
        let _guard = span.enter();

        self.events.emit_compilation_started(&CompilationStartedEvent {
            fingerprint,
            constraint_count: set.len(),
        });
        let started = Instant::now();

        match self.run(set, fingerprint) {
            Ok(ir) => {
                for note in &ir.notes {
                    let CompilationNote::ConflictResolved { kept, demoted, .. } = note;
                    self.events.emit_conflict_resolved(&ConflictResolvedEvent {
                        kept: kept.clone(),
                        demoted: demoted.clone(),
                    });
                }
                let duration_ms = started.elapsed().as_millis() as u64;
                tracing::info!(
                    fragments = ir.fragment_count(),
                    advisory = ir.advisory.len(),
                    duration_ms,
                    "compiled constraint set"
                );
                self.events.emit_compilation_finished(&CompilationFinishedEvent {
                    fingerprint,
                    fragment_count: ir.fragment_count(),
                    advisory_count: ir.advisory.len(),
                    duration_ms,
                });
                Ok(ir)
            }
            Err(e) => {
                tracing::warn!(error = %e.tagged_string(), "compilation failed");
                self.events.emit_compilation_failed(&CompilationFailedEvent {
                    fingerprint,
                    error_code: e.error_code(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Compile through `cache`: a hit skips every compilation stage.
    pub fn compile_cached(
        &self,
        cache: &ArtifactCache,
        set: &ConstraintSet,
    ) -> Result<ConstraintIR, CompileError> {
        cache.get_or_compile(set, |s| self.compile(s))
    }

    fn run(
        &self,
        set: &ConstraintSet,
        fingerprint: Fingerprint,
    ) -> Result<ConstraintIR, CompileError> {
        let graph = ConstraintGraph::build(set)?;
        let resolved = resolve(&graph)?;
        tracing::debug!(
            enforced = resolved.ordered.len(),
            advisory = resolved.advisory.len(),
            "resolved constraint graph"
        );

        let ordered = &resolved.ordered;
        let fragments = Fragments {
            schema: SchemaCompiler.compile(ordered)?,
            grammar: GrammarCompiler.compile(ordered)?,
            regex_set: RegexCompiler::new(self.config.effective_regex_size_limit())
                .compile(ordered)?,
            token_mask: TokenMaskCompiler.compile(ordered)?,
        };

        IrAssembler::new(self.config.effective_max_grammar_expansion())
            .assemble(resolved, fragments, fingerprint)
    }
}
