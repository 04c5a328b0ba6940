//! Process-wide tracing for the operator binary.
//!
//! Reconcile spans and status transitions are emitted as `tracing` events;
//! this module only installs the fmt subscriber that prints them.

use tracing_subscriber::{fmt, EnvFilter};

/// Filter for the subscriber. `RUST_LOG` wins over the configured level; an
/// unparsable level falls back to the operator default.
pub fn filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new(crate::constants::defaults::LOG_LEVEL))
}

/// Install the global subscriber. Call once, before the controller starts.
pub fn init(log_level: &str) {
    fmt().with_env_filter(filter(log_level)).with_target(true).init();
}
