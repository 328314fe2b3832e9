//! Tracing subscriber setup for the command-line front end.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to whoever embeds the engine.

use tracing_subscriber::EnvFilter;

/// Returns the filter level for the given verbosity.
///
/// `--verbose` always wins; otherwise the configured level is used.
#[must_use]
pub fn default_level(configured: &str, verbose: bool) -> &str {
    if verbose { "debug" } else { configured }
}

/// Builds the filter: `RUST_LOG` if set, else `level`, else `info`.
#[must_use]
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs a global fmt subscriber writing to stderr.
///
/// Returns `false` if a subscriber was already installed.
pub fn init(level: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}
