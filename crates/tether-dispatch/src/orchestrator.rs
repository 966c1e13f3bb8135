//! Cache-fronted compile-then-dispatch flow.

use tokio::time::Instant;

use tether_compiler::{ArtifactCache, ConstraintCompiler};
use tether_core::events::EventDispatcher;
use tether_core::{ConstraintIR, ConstraintSet, TetherConfig, TetherError};

use crate::backend::{GenerationBackend, GenerationParams};
use crate::dispatcher::{DispatchRequest, DispatchResult, Dispatcher};

/// Compiles a constraint set through the artifact cache, then dispatches the
/// resulting IR. Compilation is CPU-bound and runs on the blocking pool.
#[derive(Debug)]
pub struct Orchestrator<B> {
    compiler: ConstraintCompiler,
    cache: ArtifactCache,
    dispatcher: Dispatcher<B>,
}

impl<B: GenerationBackend> Orchestrator<B> {
    pub fn new(backend: B, config: &TetherConfig) -> Self {
        Self {
            compiler: ConstraintCompiler::new(config.compiler.clone()),
            cache: ArtifactCache::from_config(&config.cache),
            dispatcher: Dispatcher::new(backend, &config.dispatch),
        }
    }

    /// Route compiler and dispatcher events to `events`.
    pub fn with_events(self, events: EventDispatcher) -> Self {
        Self {
            compiler: self.compiler.with_events(events.clone()),
            cache: self.cache,
            dispatcher: self.dispatcher.with_events(events),
        }
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    pub fn dispatcher(&self) -> &Dispatcher<B> {
        &self.dispatcher
    }

    /// Fetch or build the IR for `set`. Concurrent callers with the same set
    /// share one compilation.
    pub async fn compile(&self, set: &ConstraintSet) -> Result<ConstraintIR, TetherError> {
        let compiler = self.compiler.clone();
        let cache = self.cache.clone();
        let set = set.clone();
        let compiled = tokio::task::spawn_blocking(move || compiler.compile_cached(&cache, &set))
            .await
            .map_err(|e| TetherError::TaskFailed {
                reason: format!("compilation task: {e}"),
            })?;
        Ok(compiled?)
    }

    /// Compile `set` and dispatch `prompt` against it.
    ///
    /// Compilation failures are returned as errors and never reach the
    /// backend. Dispatch failures are reported inside the result.
    pub async fn generate(
        &self,
        prompt: impl Into<String>,
        set: &ConstraintSet,
        params: GenerationParams,
        deadline: Option<Instant>,
    ) -> Result<DispatchResult, TetherError> {
        let ir = self.compile(set).await?;
        let mut request = DispatchRequest::new(prompt, ir).with_params(params);
        request.deadline = deadline;
        Ok(self.dispatcher.dispatch(request).await)
    }
}
