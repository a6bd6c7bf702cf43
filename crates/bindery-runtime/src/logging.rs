//! Log output setup
//!
//! The library itself only emits `tracing` events; applications (and the
//! integration tests) call [`init`] once to get them printed.

use bindery_config::Config;
use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to the
/// configured level. Returns `false` if a global subscriber already exists.
pub fn init(config: &Config) -> bool {
    init_with(config.log_level(), config.log_ansi())
}

pub fn init_with(default_level: &str, ansi: bool) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(ansi)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Subscriber for tests: writes through the test harness capture
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bindery_runtime=debug")))
        .with_test_writer()
        .try_init();
}
