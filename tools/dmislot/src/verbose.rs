//! Diagnostic output for dmislot.
//!
//! Four levels controlled by CLI flags and the config file:
//! - **Quiet** (`-q`): errors only
//! - **Default** (no flag): errors and warnings
//! - **Verbose** (`-v`): decoder decisions (entry point, slots found/skipped)
//! - **Trace** (`-vv`): every structure visited
//!
//! Messages go to stderr through the [`log`] facade so that stdout carries
//! only the lookup result.

use std::io::Write;

use log::{LevelFilter, Log, Metadata, Record};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet = 0,
    Default = 1,
    Verbose = 2,
    Trace = 3,
}

impl Verbosity {
    /// Derives the level from the `-q` flag and the number of `-v` flags.
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Default,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// Returns the `log` filter for this level.
    pub fn level_filter(self) -> LevelFilter {
        match self {
            Self::Quiet => LevelFilter::Error,
            Self::Default => LevelFilter::Warn,
            Self::Verbose => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

/// Writes `LEVEL: message` lines to stderr.
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            let _ = writeln!(std::io::stderr().lock(), "{}: {}", record.level(), record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: StderrLogger = StderrLogger;

/// Installs the stderr logger at `verbosity`.
///
/// Safe to call more than once; later calls only change the level.
pub fn init(verbosity: Verbosity) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(verbosity.level_filter());
}
