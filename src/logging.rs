//! Logging configuration for the SQL runner.
//!
//! Logs go to stderr so they never interleave with the result transcript on
//! stdout, which callers commonly redirect to a file.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info";

/// Builds the filter from `RUST_LOG`, falling back to `info`.
///
/// `verbose` raises the fallback to `debug`; an explicit `RUST_LOG` wins.
pub fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { DEFAULT_FILTER })
    })
}

/// Initializes logging to stderr.
pub fn init_stderr_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
