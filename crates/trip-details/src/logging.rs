//! Logging setup
//!
//! Logs go to stderr so they never interleave with the screen drawn on
//! stdout.

use tracing_subscriber::prelude::*;

/// Filter used when `RUST_LOG` is not set
pub fn default_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "info,trip_details=debug,trip_details_lib=debug"
    } else {
        "info"
    }
}

/// Initialize logging with sensible defaults
pub fn setup_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter()));
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter);

    if tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("Logging was already initialized");
        return;
    }

    tracing::info!("Logging initialized");
}
