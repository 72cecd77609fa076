//! Logging setup.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::error::MonitorError;

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// Interactive mode: the terminal belongs to the UI.
    FileOnly,
    /// Batch mode: stderr unless a file is given.
    FileOrStderr,
}

/// Raises `level` by the number of `-v` flags.
pub fn effective_level(level: Level, verbose: u8) -> Level {
    let from_flags = match verbose {
        0 => return level,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    // `Level` orders by verbosity: TRACE is the greatest.
    level.max(from_flags)
}

fn build_filter(level: Level) -> Result<EnvFilter, MonitorError> {
    let directive = format!("{}={}", env!("CARGO_CRATE_NAME"), level)
        .parse()
        .map_err(|e| MonitorError::Logging(format!("bad log directive: {e}")))?;
    Ok(EnvFilter::from_default_env().add_directive(directive))
}

fn open_log_file(path: &Path) -> Result<Mutex<File>, MonitorError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(Mutex::new)
        .map_err(|e| MonitorError::Logging(format!("cannot open {}: {e}", path.display())))
}

/// Installs the global subscriber.
///
/// Returns `false` when nothing was installed, which happens in interactive
/// mode without a log file.
pub fn init_logging(
    log_file: Option<&Path>,
    level: Level,
    verbose: u8,
    target: LogTarget,
) -> Result<bool, MonitorError> {
    let filter = build_filter(effective_level(level, verbose))?;

    let installed = match (log_file, target) {
        (Some(path), _) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(false)
            .with_writer(open_log_file(path)?)
            .try_init(),
        (None, LogTarget::FileOrStderr) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init(),
        (None, LogTarget::FileOnly) => return Ok(false),
    };
    installed.map_err(|e| MonitorError::Logging(e.to_string()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{debug, info};

    #[test]
    fn test_effective_level() {
        assert_eq!(effective_level(Level::INFO, 0), Level::INFO);
        assert_eq!(effective_level(Level::INFO, 1), Level::DEBUG);
        assert_eq!(effective_level(Level::WARN, 2), Level::TRACE);
        // An explicit trace level is not lowered by a single -v.
        assert_eq!(effective_level(Level::TRACE, 1), Level::TRACE);
    }

    #[test]
    fn test_interactive_without_file_installs_nothing() {
        assert!(!init_logging(None, Level::INFO, 0, LogTarget::FileOnly).unwrap());
    }

    #[test]
    fn test_file_writer_respects_level() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gcam.log");

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(build_filter(Level::INFO).unwrap())
            .with_target(false)
            .with_ansi(false)
            .with_writer(open_log_file(&path).unwrap())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            info!(rounds = 3, "source finished");
            debug!("not written");
        });

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("source finished"), "{written}");
        assert!(written.contains("rounds=3"), "{written}");
        assert!(!written.contains("not written"), "{written}");
    }

    #[test]
    fn test_unwritable_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_log_file(&dir.path().join("missing/gcam.log")).unwrap_err();
        assert!(matches!(err, MonitorError::Logging(_)));
    }
}
