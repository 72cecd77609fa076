//! Counter collection from GPFS `mmpmon`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    CounterSource (trait)                 │
//! │   ┌───────────────────────┐   ┌──────────────────────┐   │
//! │   │    MmpmonSource       │   │   ScriptedSource     │   │
//! │   │  - ssh / local spawn  │   │  - canned lines      │   │
//! │   │  - stdout/stderr      │   │    (tests)           │   │
//! │   │    reader threads     │   │                      │   │
//! │   └──────────┬────────────┘   └──────────┬───────────┘   │
//! │              └──────────┬────────────────┘               │
//! │                         │ mpsc::Sender<SourceEvent>      │
//! └─────────────────────────┼────────────────────────────────┘
//!                           ▼
//!                   control loop → parser::parse_line
//! ```
//!
//! Sources never parse. They move raw lines into the channel and report end of
//! stream; everything else happens on the receiving side.

pub mod mmpmon;
pub mod mock;
pub mod nodes;
pub mod parser;

use std::io;
use std::sync::mpsc::Sender;

use thiserror::Error;

pub use mmpmon::{MmpmonCommand, MmpmonSource};
pub use mock::ScriptedSource;
pub use nodes::{NodeDiscovery, parse_mmlsnode};
pub use parser::{FS_IO_RECORD, ParseError, Sample, SampleKey, Timestamp, parse_line, record_type};

/// First line mmpmon prints when the local daemon refuses another session.
pub const DAEMON_UNAVAILABLE: &str = "Could not establish connection to file system daemon.";

/// Failures of the counter source or of node discovery.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to send requests to mmpmon: {0}")]
    Request(#[source] io::Error),
    #[error(
        "mmpmon could not connect to the file system daemon on {host}; only a limited \
         number of mmpmon processes can run at once, stop unneeded instances there"
    )]
    DaemonUnavailable { host: String },
    #[error("'{program}' exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("mmpmon exited unexpectedly ({status})")]
    Exited { status: String },
    #[error("{0}")]
    Discovery(String),
    #[error("source already started")]
    AlreadyStarted,
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// What a source pushes into the control loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// One line of counter output, without the trailing newline.
    Line(String),
    /// One line the source wrote to its error stream.
    Stderr(String),
    /// Output stream reached end of file.
    Closed,
}

/// How a finished source ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceExit {
    pub success: bool,
    /// Human readable status (`exit status: 0`, `signal: 9`, ...).
    pub status: String,
}

impl SourceExit {
    pub fn ok() -> Self {
        Self {
            success: true,
            status: "exit status: 0".to_string(),
        }
    }
}

/// A producer of raw mmpmon response lines.
///
/// `start` may be called once. After the source has sent
/// [`SourceEvent::Closed`], `wait` reports how it ended. `terminate` stops it
/// at any point and must be safe to call more than once.
pub trait CounterSource: Send {
    /// Starts producing events for `nodes` into `tx`.
    fn start(&mut self, nodes: &[String], tx: Sender<SourceEvent>) -> Result<(), SourceError>;

    /// Reaps a source whose stream has closed.
    fn wait(&mut self) -> Result<SourceExit, SourceError>;

    /// Stops the source and releases its resources.
    fn terminate(&mut self);

    /// Short description for logs and the UI (`mmpmon@host`).
    fn describe(&self) -> String;
}

impl<T: CounterSource + ?Sized> CounterSource for Box<T> {
    fn start(&mut self, nodes: &[String], tx: Sender<SourceEvent>) -> Result<(), SourceError> {
        (**self).start(nodes, tx)
    }

    fn wait(&mut self) -> Result<SourceExit, SourceError> {
        (**self).wait()
    }

    fn terminate(&mut self) {
        (**self).terminate()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
