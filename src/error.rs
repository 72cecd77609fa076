//! Top-level error type and exit codes.

use std::io;

use thiserror::Error;

use crate::collector::SourceError;

/// Anything that ends a monitoring session early.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("no data from {source_name} for {waited:.0}s across {windows} stall windows, giving up")]
    Stalled {
        source_name: String,
        waited: f64,
        windows: u32,
    },
    #[error(
        "stdout is not a terminal; use 'ssh -t' when running remotely, or --batch for plain output"
    )]
    NotATerminal,
    #[error("failed to initialize logging: {0}")]
    Logging(String),
    #[error("terminal error: {0}")]
    Terminal(#[source] io::Error),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl MonitorError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            MonitorError::Config(_) => 2,
            _ => 1,
        }
    }
}
