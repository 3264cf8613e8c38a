//! Logging Infrastructure
//!
//! The library only emits `tracing` events; applications (and the test
//! suites) install a subscriber through these helpers.

use tracing_subscriber::EnvFilter;

/// Initialize the logger at `info`, overridable with `RUST_LOG`
pub fn init_logger() {
    init_logger_with_level(None);
}

/// Initialize the logger with an explicit default level
///
/// Does nothing if a global subscriber is already installed.
pub fn init_logger_with_level(log_level: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(true)
        .try_init();
}

/// Subscriber writing through the test harness capture
pub fn init_test_logger() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("pim_client=debug"))
        .with_test_writer()
        .try_init();
}
