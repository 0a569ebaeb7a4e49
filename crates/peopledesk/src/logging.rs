//! Diagnostics for `pdesk`.
//!
//! Tables go to stdout and one-shot notices to stderr; `tracing` output
//! shares stderr with the notices. At the default level only retries,
//! fallbacks and malformed server data show up. `-v` adds request traffic,
//! `-vv` the HTTP client's own events.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How chatty the diagnostics are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Errors only (`-q`).
    Quiet,
    /// Warnings: retries, cache fallbacks, skipped records.
    #[default]
    Normal,
    /// Requests and state changes (`-v`).
    Verbose,
    /// Everything, including the HTTP client (`-vv`).
    Trace,
}

impl Verbosity {
    /// Level applied to this crate's own events.
    #[must_use]
    pub fn level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    ///
    /// The HTTP stack stays at `warn` unless tracing is asked for.
    #[must_use]
    pub fn directive(self) -> String {
        let http = if self == Self::Trace { "debug" } else { "warn" };
        format!(
            "peopledesk={},reqwest={http},hyper_util={http}",
            self.level()
        )
    }
}

/// Install the global subscriber.
///
/// Call once from `main`; later calls are no-ops. `RUST_LOG`, when set,
/// replaces the directive derived from `verbosity`.
///
/// ```no_run
/// use peopledesk::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));

    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbosity >= Verbosity::Verbose)
        .without_time();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .try_init();
}

/// Route warnings from tests through the test writer.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("peopledesk=warn")
        .with_test_writer()
        .try_init();
}
