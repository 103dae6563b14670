//! Tracing setup shared by `serve`, `simulate` and the offline commands.
//!
//! Output goes to stderr so `decode --json` and friends stay pipeable.
//! `RUST_LOG`, when set, replaces the directive derived from `-v`/`-q`.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How chatty the binary is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Errors only (`-q`).
    Quiet,
    /// Lifecycle events and simulator status lines.
    #[default]
    Normal,
    /// Per-frame debug events plus HTTP request spans (`-v`).
    Verbose,
    /// Everything, with source locations (`-vv`).
    Trace,
}

impl Verbosity {
    /// Map the `-v` count and `-q` switch onto a verbosity. `-q` wins.
    #[must_use]
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// Most detailed level emitted by this crate.
    #[must_use]
    pub fn level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Filter directive used when `RUST_LOG` is unset.
    ///
    /// `tower_http` request spans join in from `Verbose` up.
    #[must_use]
    pub fn default_directive(self) -> String {
        let level = self.level();
        if self >= Self::Verbose {
            format!("fleetpulse={level},tower_http={level}")
        } else {
            format!("fleetpulse={level}")
        }
    }
}

/// `RUST_LOG` if it parses, otherwise the directive for `verbosity`.
fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.default_directive()))
}

/// Install the global subscriber. Later calls are no-ops.
///
/// ```no_run
/// use fleetpulse::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::from_flags(1, false));
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let locations = verbosity == Verbosity::Trace;
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(locations)
        .with_line_number(locations);

    let _ = tracing_subscriber::registry()
        .with(env_filter(verbosity))
        .with(layer)
        .try_init();
}

/// Capture warnings through the test harness writer.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("fleetpulse=warn")
        .with_test_writer()
        .try_init();
}
