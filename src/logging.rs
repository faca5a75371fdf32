//! # Structured Logging
//!
//! Console logging through `tracing-subscriber` with an environment-driven
//! filter (`RUST_LOG`, default `info`). Initialization is idempotent so
//! library consumers, binaries, and tests can all call it unconditionally.

use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize console logging once for the process.
pub fn init() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let initialized = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_names(true)
            .try_init();
        if initialized.is_err() {
            // A global subscriber is already installed; keep using it.
            tracing::debug!("global tracing subscriber already initialized");
        }
    });
}
