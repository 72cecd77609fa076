//! Validated runtime configuration.
//!
//! The binary parses command-line arguments with clap and converts them into
//! a [`MonitorConfig`]; library code only ever sees the validated form.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::collector::mmpmon::DEFAULT_MMPMON;
use crate::collector::nodes::DEFAULT_MMLSNODE;
use crate::collector::{MmpmonCommand, NodeDiscovery};
use crate::error::MonitorError;

pub const DEFAULT_INTERVAL_SECS: f64 = 3.0;
pub const MIN_INTERVAL_SECS: f64 = 1.0;
pub const DEFAULT_STALL_INTERVALS: u32 = 5;
pub const DEFAULT_STALL_LIMIT: u32 = 4;

/// Layout of the live display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// One row per node and filesystem, with subtotals.
    #[default]
    Flat,
    /// Separate read and write node × filesystem matrices.
    Separated,
    /// One matrix with a read and a write line per node.
    Interlaced,
}

impl ViewMode {
    pub fn next(self) -> Self {
        match self {
            ViewMode::Flat => ViewMode::Separated,
            ViewMode::Separated => ViewMode::Interlaced,
            ViewMode::Interlaced => ViewMode::Flat,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ViewMode::Flat => "flat",
            ViewMode::Separated => "separated",
            ViewMode::Interlaced => "interlaced",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flat" => Ok(ViewMode::Flat),
            "separated" | "sep" => Ok(ViewMode::Separated),
            "interlaced" | "int" => Ok(ViewMode::Interlaced),
            other => Err(format!(
                "unknown view '{other}' (expected flat, separated or interlaced)"
            )),
        }
    }
}

/// Where the list of monitored nodes comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeSelection {
    /// Ask `mmlsnode`, optionally for a named nodeset.
    Discover { nodeset: Option<String> },
    /// Use exactly these nodes.
    Explicit(Vec<String>),
}

impl NodeSelection {
    /// Label for the "collecting initial data" message.
    pub fn label(&self) -> String {
        match self {
            NodeSelection::Discover { nodeset: Some(n) } => format!("{n} nodeset"),
            NodeSelection::Discover { nodeset: None } => "default nodeset".to_string(),
            NodeSelection::Explicit(nodes) => format!("{} listed nodes", nodes.len()),
        }
    }
}

/// Everything a monitoring session needs.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub host: String,
    pub interval: Duration,
    pub nodes: NodeSelection,
    pub view: ViewMode,
    /// mmpmon repetitions, 0 for unlimited.
    pub runs: u32,
    pub batch: bool,
    pub print_last: bool,
    pub stall_intervals: u32,
    pub stall_limit: u32,
    pub mmpmon: PathBuf,
    pub mmlsnode: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            interval: Duration::from_secs_f64(DEFAULT_INTERVAL_SECS),
            nodes: NodeSelection::Discover { nodeset: None },
            view: ViewMode::default(),
            runs: 0,
            batch: false,
            print_last: true,
            stall_intervals: DEFAULT_STALL_INTERVALS,
            stall_limit: DEFAULT_STALL_LIMIT,
            mmpmon: PathBuf::from(DEFAULT_MMPMON),
            mmlsnode: PathBuf::from(DEFAULT_MMLSNODE),
        }
    }
}

/// Converts an interval in seconds, rejecting values below one second.
pub fn interval_from_secs(secs: f64) -> Result<Duration, MonitorError> {
    if !secs.is_finite() || secs < MIN_INTERVAL_SECS {
        return Err(MonitorError::Config(format!(
            "interval must be at least {MIN_INTERVAL_SECS} second, got {secs}"
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| MonitorError::Config(format!("interval {secs} is out of range: {e}")))
}

/// Splits a comma separated node list, dropping blanks and duplicates.
pub fn parse_node_list(list: &str) -> Vec<String> {
    let mut nodes: Vec<String> = list
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect();
    nodes.sort();
    nodes.dedup();
    nodes
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.interval < Duration::from_secs_f64(MIN_INTERVAL_SECS) {
            return Err(MonitorError::Config(format!(
                "interval must be at least {MIN_INTERVAL_SECS} second"
            )));
        }
        if self.stall_intervals == 0 {
            return Err(MonitorError::Config(
                "--stall-intervals must be at least 1".to_string(),
            ));
        }
        if self.interval.checked_mul(self.stall_intervals).is_none() {
            return Err(MonitorError::Config(format!(
                "stall window of {} x {}s is out of range",
                self.stall_intervals,
                self.interval_secs()
            )));
        }
        if self.stall_limit == 0 {
            return Err(MonitorError::Config(
                "--stall-limit must be at least 1".to_string(),
            ));
        }
        if self.host.trim().is_empty() {
            return Err(MonitorError::Config("host must not be empty".to_string()));
        }
        if let NodeSelection::Explicit(nodes) = &self.nodes
            && nodes.is_empty()
        {
            return Err(MonitorError::Config("--nodes lists no nodes".to_string()));
        }
        Ok(())
    }

    pub fn interval_secs(&self) -> f64 {
        self.interval.as_secs_f64()
    }

    /// How long the source may stay silent before it counts as stalled.
    pub fn stall_timeout(&self) -> Duration {
        self.interval.saturating_mul(self.stall_intervals)
    }

    pub fn mmpmon_command(&self) -> MmpmonCommand {
        MmpmonCommand {
            program: self.mmpmon.clone(),
            host: self.host.clone(),
            runs: self.runs,
            delay: self.interval,
        }
    }

    pub fn node_discovery(&self) -> Option<NodeDiscovery> {
        match &self.nodes {
            NodeSelection::Discover { nodeset } => Some(NodeDiscovery {
                program: self.mmlsnode.clone(),
                host: self.host.clone(),
                nodeset: nodeset.clone(),
            }),
            NodeSelection::Explicit(_) => None,
        }
    }
}
