//! Logging initialization.

use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber.
///
/// The filter defaults to `info` and can be overridden through the
/// `RUST_LOG` environment variable.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
