//! Dispatch errors, surfaced only after retries are exhausted or the
//! deadline has passed.

use super::error_code::{self, TetherErrorCode};
use crate::fingerprint::Fingerprint;

/// Failure reported by (or on the way to) the generation backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("backend overloaded: {message}")]
    Overloaded { message: String },

    #[error("constraints unsatisfiable: {message}")]
    ConstraintUnsatisfiable { message: String },

    #[error("malformed IR: {message}")]
    MalformedIr { message: String },

    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl BackendError {
    /// Transient failures are retried; validation-class failures are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Overloaded { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("dispatch of {fingerprint} timed out after {elapsed_ms} ms ({attempts} attempts)")]
    Timeout {
        fingerprint: Fingerprint,
        attempts: u32,
        elapsed_ms: u64,
        /// Most recent transient failure before the deadline, if any attempt
        /// failed rather than hung.
        last_cause: Option<BackendError>,
    },

    #[error("backend error for {fingerprint} after {attempts} attempts: {cause}")]
    Backend {
        fingerprint: Fingerprint,
        attempts: u32,
        retryable: bool,
        cause: BackendError,
    },
}

impl DispatchError {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Timeout { attempts, .. } | Self::Backend { attempts, .. } => *attempts,
        }
    }

    /// The last backend failure seen before giving up, if any.
    pub fn last_cause(&self) -> Option<&BackendError> {
        match self {
            Self::Timeout { last_cause, .. } => last_cause.as_ref(),
            Self::Backend { cause, .. } => Some(cause),
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        match self {
            Self::Timeout { fingerprint, .. } | Self::Backend { fingerprint, .. } => *fingerprint,
        }
    }
}

impl TetherErrorCode for DispatchError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => error_code::DISPATCH_TIMEOUT,
            Self::Backend { .. } => error_code::DISPATCH_BACKEND_ERROR,
        }
    }
}
