//! Tracing subscriber setup
//!
//! Events go to stderr so that stdout stays reserved for CSV output.
//! `RUST_LOG` overrides the default filter.

use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Build the filter from `RUST_LOG`, falling back to `default_filter`
pub fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install the global subscriber
///
/// Calling this more than once is harmless; later calls keep the first
/// subscriber.
pub fn init(default_filter: &str) {
    let layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(layer)
        .try_init();
}
