//! Logging setup for promptmonitor.
//!
//! Everything logs through `tracing`. Identifiers never appear in full at
//! `info` or above; those events carry counts only.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crates whose own logging is capped at `warn` unless `RUST_LOG` says otherwise.
const QUIET_DEPENDENCIES: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls"];

/// How much the CLI logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Info and above.
    #[default]
    Normal,
    /// Debug and above.
    Verbose,
    /// Everything, including each interceptor stage.
    Trace,
}

impl Verbosity {
    /// The most detailed level emitted at this verbosity.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// The `EnvFilter` directives used when `RUST_LOG` is unset.
    #[must_use]
    pub fn directives(&self) -> String {
        let level = self.to_level_filter();
        let mut directives = vec![format!("promptmonitor={level}"), format!("pmon={level}")];
        directives.extend(QUIET_DEPENDENCIES.iter().map(|krate| format!("{krate}=warn")));
        directives.join(",")
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `verbosity` when set. Output goes to stderr so that
/// command output on stdout can be piped. Calling this more than once is
/// harmless; later calls are ignored.
///
/// ```no_run
/// use promptmonitor::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directives()));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity >= Verbosity::Verbose)
                .compact(),
        )
        .try_init();
}
