//! TetherErrorCode trait for stable, machine-readable error codes.

/// Every error enum implements this so adapters can map failures to a
/// stable code string without matching on messages.
pub trait TetherErrorCode {
    /// Returns the error code string (e.g., "DEPENDENCY_CYCLE").
    fn error_code(&self) -> &'static str;

    /// Returns the formatted string: `[ERROR_CODE] message`.
    fn tagged_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

// Compilation
pub const DANGLING_REFERENCE: &str = "DANGLING_REFERENCE";
pub const INVALID_CONSTRAINT: &str = "INVALID_CONSTRAINT";
pub const DEPENDENCY_CYCLE: &str = "DEPENDENCY_CYCLE";
pub const UNRESOLVABLE_CONFLICT: &str = "UNRESOLVABLE_CONFLICT";
pub const AMBIGUOUS_GRAMMAR: &str = "AMBIGUOUS_GRAMMAR";
pub const INVALID_PATTERN: &str = "INVALID_PATTERN";
pub const INCONSISTENT_IR: &str = "INCONSISTENT_IR";

// Cache
pub const CACHE_CORRUPTION: &str = "CACHE_CORRUPTION";

// Dispatch
pub const DISPATCH_TIMEOUT: &str = "DISPATCH_TIMEOUT";
pub const DISPATCH_BACKEND_ERROR: &str = "DISPATCH_BACKEND_ERROR";

// Config
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";

// Runtime
pub const TASK_FAILED: &str = "TASK_FAILED";
