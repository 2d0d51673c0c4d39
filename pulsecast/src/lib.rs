//! Pipeline roles and process configuration of pulsecast.

/// Producer, enricher and commentary generator runners.
pub mod app;
/// Process configuration loading.
pub mod config;

use tracing_subscriber::EnvFilter;

/// Default log filter when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "info";

/// Installs the global log collector, honouring `RUST_LOG`.
pub fn install_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
