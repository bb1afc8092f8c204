//! Diagnostic logging for the reporting layer.
//!
//! Logs go to stderr so they never interleave with the analysis streamed to stdout.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, in `tracing-subscriber` directive syntax.
pub const LOG_ENV: &str = "FINCANTATEM_LOG";
const DEFAULT_FILTER: &str = "warn";

/// Installs the global subscriber. Later calls, or an already installed subscriber, are ignored.
pub fn init() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
