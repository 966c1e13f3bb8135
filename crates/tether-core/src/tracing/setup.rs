//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable holding the filter directive.
pub const LOG_ENV: &str = "TETHER_LOG";

const DEFAULT_FILTER: &str = "tether=info";

/// Initialize the Tether tracing/logging system.
///
/// Reads `TETHER_LOG` for per-crate log levels, e.g.
/// `TETHER_LOG=tether_compiler=debug,tether_dispatch=info`.
/// Falls back to `tether=info` if unset or invalid.
///
/// Idempotent. Does nothing if another global subscriber is already set.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true),
            )
            .with(filter)
            .try_init();
    });
}
