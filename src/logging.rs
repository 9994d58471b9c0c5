//! Logging setup
//!
//! Library code only emits `tracing` events. Binaries and demos call
//! [`init_tracing`] once to get formatted output filtered by `RUST_LOG`.

use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set. Returns `false` if a
/// global subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}
