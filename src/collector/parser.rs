//! Parser for `mmpmon -p` response lines.
//!
//! These are pure functions that turn one line of mmpmon output into a typed
//! [`Sample`]. They are designed to be easily testable with string inputs.
//!
//! Format of a data record (one line, shown wrapped):
//!
//! ```text
//! _fs_io_s_ _n_ 10.0.0.1 _nn_ node1 _rc_ 0 _t_ 1066660148 _tu_ 407431
//!   _cl_ cluster.example.com _fs_ gpfs1 _d_ 2 _br_ 6291456 _bw_ 314572800
//!   _oc_ 10 _cc_ 8 _rdc_ 6 _wc_ 300 _dir_ 2 _iu_ 5
//! ```

use std::fmt;

use thiserror::Error;

/// Record tag of per-filesystem I/O statistics.
pub const FS_IO_RECORD: &str = "fs_io_s";

/// Error type for lines that do not yield a [`Sample`].
///
/// Every variant is recoverable: the caller skips the line and continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty line")]
    Empty,
    #[error("not an mmpmon record")]
    NotARecord,
    #[error("'{record}' record is not fs_io_s data")]
    NotFsIo { record: String },
    #[error("fs_io_s record reports rc={rc}")]
    Status { rc: String },
    #[error("missing field _{0}_")]
    MissingField(&'static str),
    #[error("invalid value '{value}' for _{field}_")]
    InvalidNumber { field: &'static str, value: String },
    #[error("microseconds out of range: {0}")]
    InvalidMicros(u64),
}

impl ParseError {
    /// Status and control records are a normal part of the stream, as opposed
    /// to lines that look like data but are damaged.
    pub fn is_control(&self) -> bool {
        matches!(
            self,
            ParseError::Empty | ParseError::NotFsIo { .. } | ParseError::Status { .. }
        )
    }
}

/// Sample timestamp in microseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const MICROS_PER_SEC: u64 = 1_000_000;

    /// Saturates at `u64::MAX` microseconds.
    pub fn from_parts(secs: u64, micros: u32) -> Self {
        Self(
            secs.saturating_mul(Self::MICROS_PER_SEC)
                .saturating_add(u64::from(micros)),
        )
    }

    /// `None` when the instant does not fit in a `u64` of microseconds.
    pub fn checked_from_parts(secs: u64, micros: u32) -> Option<Self> {
        secs.checked_mul(Self::MICROS_PER_SEC)
            .and_then(|m| m.checked_add(u64::from(micros)))
            .map(Self)
    }

    pub fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    pub fn as_micros(self) -> u64 {
        self.0
    }

    pub fn secs(self) -> u64 {
        self.0 / Self::MICROS_PER_SEC
    }

    pub fn subsec_micros(self) -> u32 {
        (self.0 % Self::MICROS_PER_SEC) as u32
    }

    /// Seconds elapsed since `earlier`, or `None` unless `self` is strictly later.
    pub fn secs_since(self, earlier: Timestamp) -> Option<f64> {
        (self.0 > earlier.0).then(|| (self.0 - earlier.0) as f64 / Self::MICROS_PER_SEC as f64)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.secs(), self.subsec_micros())
    }
}

/// Identity of one counter stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SampleKey {
    pub node: String,
    pub filesystem: String,
}

impl SampleKey {
    pub fn new(node: impl Into<String>, filesystem: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            filesystem: filesystem.into(),
        }
    }
}

impl fmt::Display for SampleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.node, self.filesystem)
    }
}

/// One parsed counter reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub key: SampleKey,
    pub cluster: String,
    pub timestamp: Timestamp,
    /// Cumulative bytes read since the reporting daemon started.
    pub bytes_read: u64,
    /// Cumulative bytes written since the reporting daemon started.
    pub bytes_written: u64,
}

impl Sample {
    pub fn node(&self) -> &str {
        &self.key.node
    }

    pub fn filesystem(&self) -> &str {
        &self.key.filesystem
    }
}

/// Returns the record type of an mmpmon line (`"fs_io_s"` for `_fs_io_s_`).
pub fn record_type(line: &str) -> Option<&str> {
    let tag = line.split_whitespace().next()?;
    strip_underscores(tag)
}

fn strip_underscores(token: &str) -> Option<&str> {
    token
        .strip_prefix('_')?
        .strip_suffix('_')
        .filter(|name| !name.is_empty())
}

/// Key/value view over the tokens following the record tag.
struct Fields<'a> {
    pairs: Vec<(&'a str, &'a str)>,
}

impl<'a> Fields<'a> {
    fn new(tokens: &[&'a str]) -> Self {
        let pairs = tokens
            .chunks_exact(2)
            .filter_map(|pair| strip_underscores(pair[0]).map(|k| (k, pair[1])))
            .collect();
        Self { pairs }
    }

    fn get(&self, name: &'static str) -> Result<&'a str, ParseError> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| *v)
            .ok_or(ParseError::MissingField(name))
    }

    fn get_u64(&self, name: &'static str) -> Result<u64, ParseError> {
        let value = self.get(name)?;
        value.parse().map_err(|_| ParseError::InvalidNumber {
            field: name,
            value: value.to_string(),
        })
    }
}

/// Parses one line of `mmpmon -p` output into a [`Sample`].
///
/// Only successful `_fs_io_s_` records produce a sample. Unknown keys are
/// ignored so newer mmpmon releases with extra counters still parse.
pub fn parse_line(line: &str) -> Result<Sample, ParseError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((tag, rest)) = tokens.split_first() else {
        return Err(ParseError::Empty);
    };
    let record = strip_underscores(tag).ok_or(ParseError::NotARecord)?;
    if record != FS_IO_RECORD {
        return Err(ParseError::NotFsIo {
            record: record.to_string(),
        });
    }

    let fields = Fields::new(rest);
    let rc = fields.get("rc")?;
    if rc != "0" {
        return Err(ParseError::Status { rc: rc.to_string() });
    }

    let secs = fields.get_u64("t")?;
    let micros = fields.get_u64("tu")?;
    if micros >= Timestamp::MICROS_PER_SEC {
        return Err(ParseError::InvalidMicros(micros));
    }
    let timestamp = Timestamp::checked_from_parts(secs, micros as u32).ok_or_else(|| {
        ParseError::InvalidNumber {
            field: "t",
            value: secs.to_string(),
        }
    })?;

    Ok(Sample {
        key: SampleKey::new(fields.get("nn")?, fields.get("fs")?),
        cluster: fields.get("cl")?.to_string(),
        timestamp,
        bytes_read: fields.get_u64("br")?,
        bytes_written: fields.get_u64("bw")?,
    })
}

#[cfg(test)]
pub(crate) fn format_fs_io_line(
    node: &str,
    fs: &str,
    secs: u64,
    micros: u32,
    br: u64,
    bw: u64,
) -> String {
    format!(
        "_fs_io_s_ _n_ 10.0.0.1 _nn_ {node} _rc_ 0 _t_ {secs} _tu_ {micros} \
         _cl_ c1.example.com _fs_ {fs} _d_ 2 _br_ {br} _bw_ {bw} \
         _oc_ 4 _cc_ 3 _rdc_ 10 _wc_ 20 _dir_ 1 _iu_ 0"
    )
}
