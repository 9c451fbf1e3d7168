//! Tracing setup.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info,till=debug,sqlx=warn";

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` overrides [`DEFAULT_FILTER`]. Calling it again is a no-op, so
/// binaries and tests may both call it.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
