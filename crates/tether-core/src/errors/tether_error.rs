//! Top-level error aggregating subsystem errors via `From` conversions.

use super::error_code::{self, TetherErrorCode};
use super::{CompileError, ConfigError, DispatchError};

#[derive(Debug, thiserror::Error)]
pub enum TetherError {
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("background task failed: {reason}")]
    TaskFailed { reason: String },
}

pub type TetherResult<T> = Result<T, TetherError>;

impl TetherErrorCode for TetherError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Compile(e) => e.error_code(),
            Self::Dispatch(e) => e.error_code(),
            Self::Config(e) => e.error_code(),
            Self::TaskFailed { .. } => error_code::TASK_FAILED,
        }
    }
}
