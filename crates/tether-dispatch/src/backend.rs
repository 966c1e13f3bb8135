//! The generation backend seam.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use tether_core::errors::BackendError;
use tether_core::ConstraintIR;

/// Sampling parameters forwarded verbatim to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.0,
            top_p: 1.0,
            stop: Vec::new(),
            seed: None,
        }
    }
}

/// One outbound call. Retries of a request share `request_id`.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub request_id: String,
    /// Starts at 1.
    pub attempt: u32,
    pub prompt: String,
    pub params: GenerationParams,
    pub ir: Arc<ConstraintIR>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    #[serde(default)]
    pub token_count: Option<u32>,
    /// Time spent inside the backend, as it reports it.
    #[serde(default)]
    pub backend_latency_ms: Option<u64>,
    /// Constraints the backend could not enforce and relaxed.
    #[serde(default)]
    pub relaxed_constraints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendResponse {
    pub text: String,
    #[serde(default)]
    pub metadata: ResponseMetadata,
}

impl BackendResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: ResponseMetadata::default(),
        }
    }
}

/// A guided-decoding backend that enforces a [`ConstraintIR`] while
/// generating.
///
/// Dropping the returned future must abandon the call; the dispatcher drops
/// it when a deadline passes.
pub trait GenerationBackend: Send + Sync + 'static {
    /// Name recorded in dispatch provenance.
    fn name(&self) -> &str;

    fn generate(
        &self,
        request: &BackendRequest,
    ) -> impl Future<Output = Result<BackendResponse, BackendError>> + Send;
}
