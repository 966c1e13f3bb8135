//! Retrying dispatcher.
//!
//! Each request gets a deadline of `now + request_timeout`, tightened by the
//! caller's own deadline if one is given. Attempts run inside that budget:
//! transient backend failures are retried with backoff, anything else ends
//! the request. Once the deadline passes the in-flight call is dropped and
//! no further attempt starts.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::Instrument;

use tether_core::config::DispatchConfig;
use tether_core::errors::{BackendError, DispatchError};
use tether_core::events::{DispatchFinishedEvent, DispatchRetryEvent, EventDispatcher};
use tether_core::tracing::fields;
use tether_core::{ConstraintIR, Fingerprint};

use crate::backend::{
    BackendRequest, BackendResponse, GenerationBackend, GenerationParams, ResponseMetadata,
};
use crate::retry::RetryPolicy;

/// A prompt paired with the IR the backend must enforce.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub prompt: String,
    pub ir: ConstraintIR,
    pub params: GenerationParams,
    /// Absolute deadline set by the caller, if any.
    pub deadline: Option<Instant>,
}

impl DispatchRequest {
    pub fn new(prompt: impl Into<String>, ir: ConstraintIR) -> Self {
        Self {
            prompt: prompt.into(),
            ir,
            params: GenerationParams::default(),
            deadline: None,
        }
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Generated text plus whatever the backend reported about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedOutput {
    pub text: String,
    pub metadata: ResponseMetadata,
}

impl From<BackendResponse> for GeneratedOutput {
    fn from(response: BackendResponse) -> Self {
        Self {
            text: response.text,
            metadata: response.metadata,
        }
    }
}

/// How a dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Success,
    /// Every attempt failed with a retryable error.
    TransientExhausted,
    /// A non-retryable backend error.
    Terminal,
    TimedOut,
}

/// Where a result came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchProvenance {
    pub request_id: String,
    pub backend: String,
    pub source_fingerprint: Fingerprint,
    pub attempts: u32,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub outcome: Result<GeneratedOutput, DispatchError>,
    pub classification: Classification,
    pub retry_count: u32,
    pub latency: Duration,
    pub provenance: DispatchProvenance,
}

impl DispatchResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn into_output(self) -> Result<GeneratedOutput, DispatchError> {
        self.outcome
    }
}

fn classify(outcome: &Result<GeneratedOutput, DispatchError>) -> Classification {
    match outcome {
        Ok(_) => Classification::Success,
        Err(DispatchError::Timeout { .. }) => Classification::TimedOut,
        Err(DispatchError::Backend { retryable: true, .. }) => Classification::TransientExhausted,
        Err(DispatchError::Backend { retryable: false, .. }) => Classification::Terminal,
    }
}

/// Sends requests to a backend through a bounded pool of concurrent calls.
pub struct Dispatcher<B> {
    backend: Arc<B>,
    policy: RetryPolicy,
    request_timeout: Duration,
    permits: Arc<Semaphore>,
    pool_size: usize,
    events: EventDispatcher,
}

impl<B: GenerationBackend> Dispatcher<B> {
    pub fn new(backend: B, config: &DispatchConfig) -> Self {
        let pool_size = config.effective_max_concurrency().max(1);
        Self {
            backend: Arc::new(backend),
            policy: RetryPolicy::from_config(config),
            request_timeout: config.effective_request_timeout(),
            permits: Arc::new(Semaphore::new(pool_size)),
            pool_size,
            events: EventDispatcher::new(),
        }
    }

    pub fn with_events(mut self, events: EventDispatcher) -> Self {
        self.events = events;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Pool slots not currently held by an in-flight call.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Dispatch one request. Never panics and never returns early on a
    /// transient error while attempts and budget remain.
    pub async fn dispatch(&self, request: DispatchRequest) -> DispatchResult {
        let request_id = uuid::Uuid::new_v4().to_string();
        let fingerprint = request.ir.source_fingerprint;
        let span = tracing::info_span!(
            fields::SPAN_DISPATCH,
            request_id = %request_id,
            fingerprint = %fingerprint.short(),
            backend = self.backend.name(),
        );
        self.run(request_id, request).instrument(span).await
    }

    async fn run(&self, request_id: String, request: DispatchRequest) -> DispatchResult {
        let started = Instant::now();
        let started_at = Utc::now();
        let fingerprint = request.ir.source_fingerprint;
        let budget_end = started + self.request_timeout;
        let deadline = request.deadline.map_or(budget_end, |d| d.min(budget_end));

        let ir = Arc::new(request.ir);
        let mut attempts = 0u32;
        let mut last_cause: Option<BackendError> = None;

        let outcome = loop {
            attempts += 1;
            let call = BackendRequest {
                request_id: request_id.clone(),
                attempt: attempts,
                prompt: request.prompt.clone(),
                params: request.params.clone(),
                ir: Arc::clone(&ir),
            };

            let cause = match tokio::time::timeout_at(deadline, self.call(&call)).await {
                Ok(Ok(response)) => break Ok(GeneratedOutput::from(response)),
                Ok(Err(cause)) => cause,
                Err(_) => {
                    tracing::warn!(attempt = attempts, "deadline passed; in-flight call dropped");
                    break Err(timeout(fingerprint, attempts, started, last_cause));
                }
            };

            let retryable = cause.is_retryable();
            if !retryable || attempts >= self.policy.max_attempts {
                tracing::warn!(
                    attempt = attempts,
                    retryable,
                    error = %cause,
                    "backend call failed"
                );
                break Err(DispatchError::Backend {
                    fingerprint,
                    attempts,
                    retryable,
                    cause,
                });
            }

            let delay = self.policy.delay(attempts);
            if Instant::now() + delay >= deadline {
                tracing::warn!(
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %cause,
                    "retry would start past the deadline"
                );
                break Err(timeout(fingerprint, attempts, started, Some(cause)));
            }

            tracing::debug!(
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %cause,
                "retrying backend call"
            );
            self.events.emit_dispatch_retry(&DispatchRetryEvent {
                request_id: request_id.clone(),
                fingerprint,
                attempt: attempts,
                delay_ms: delay.as_millis() as u64,
                error: cause.to_string(),
            });
            last_cause = Some(cause);
            tokio::time::sleep(delay).await;
        };

        let latency = started.elapsed();
        let retry_count = attempts - 1;
        let classification = classify(&outcome);
        tracing::info!(
            ?classification,
            retry_count,
            latency_ms = latency.as_millis() as u64,
            "dispatch finished"
        );
        self.events.emit_dispatch_finished(&DispatchFinishedEvent {
            request_id: request_id.clone(),
            fingerprint,
            success: outcome.is_ok(),
            retry_count,
            latency_ms: latency.as_millis() as u64,
        });

        DispatchResult {
            outcome,
            classification,
            retry_count,
            latency,
            provenance: DispatchProvenance {
                request_id,
                backend: self.backend.name().to_string(),
                source_fingerprint: fingerprint,
                attempts,
                started_at,
            },
        }
    }

    /// One backend call holding a pool slot. The slot is released when the
    /// call finishes or is dropped, so backoff sleeps never hold one.
    async fn call(&self, request: &BackendRequest) -> Result<BackendResponse, BackendError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| BackendError::Transport {
                message: "dispatcher pool closed".to_string(),
            })?;
        self.backend.generate(request).await
    }
}

fn timeout(
    fingerprint: Fingerprint,
    attempts: u32,
    started: Instant,
    last_cause: Option<BackendError>,
) -> DispatchError {
    DispatchError::Timeout {
        fingerprint,
        attempts,
        elapsed_ms: started.elapsed().as_millis() as u64,
        last_cause,
    }
}

impl<B> std::fmt::Debug for Dispatcher<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("policy", &self.policy)
            .field("request_timeout", &self.request_timeout)
            .field("pool_size", &self.pool_size)
            .finish_non_exhaustive()
    }
}
