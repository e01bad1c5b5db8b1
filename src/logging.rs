//! Tracing initialization for embedding applications

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber with the given filter
/// directive (e.g. "info", "vulnsift=debug"). `RUST_LOG` takes
/// precedence when set. Safe to call more than once; later calls are
/// no-ops.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
