//! Error handling for Tether.
//! One error enum per subsystem, `thiserror` only.

pub mod cache_error;
pub mod compile_error;
pub mod config_error;
pub mod dispatch_error;
pub mod error_code;
pub mod tether_error;

pub use cache_error::CacheError;
pub use compile_error::CompileError;
pub use config_error::ConfigError;
pub use dispatch_error::{BackendError, DispatchError};
pub use error_code::TetherErrorCode;
pub use tether_error::{TetherError, TetherResult};
