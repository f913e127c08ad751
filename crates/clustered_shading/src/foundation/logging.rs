//! Logging setup
//!
//! The crate logs through the `log` facade: grid changes at `info`, full
//! buckets at `debug`, per-frame counters at `trace`. Binaries and tests pick
//! the backend; `env_logger` is wired up here.

pub use log::{debug, info, warn, error, trace};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "clustered_shading=info";

/// Initialize the logging system
///
/// `RUST_LOG` overrides [`DEFAULT_FILTER`].
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEFAULT_FILTER)).init();
}

/// Initialize logging for unit tests
///
/// Safe to call from every test; only the first call installs the logger.
pub fn init_for_tests() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("clustered_shading=trace"))
        .is_test(true)
        .try_init();
}
