//! Compiled-in defaults, referenced by every `effective_*` accessor.

pub const DEFAULT_CACHE_CAPACITY: u64 = 256;

/// Upper bound on the number of strings enumerated per grammar rule during
/// cross-fragment validation.
pub const DEFAULT_MAX_GRAMMAR_EXPANSION: usize = 256;
/// Compiled-program size limit for the `regex` crate, in bytes.
pub const DEFAULT_REGEX_SIZE_LIMIT: usize = 1 << 20;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 100;
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 5_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;
pub const DEFAULT_JITTER: bool = true;
