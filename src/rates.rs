//! Counter state and throughput computation.
//!
//! [`CounterState`] keeps the last reading per (node, filesystem) key and
//! [`DeltaEngine`] turns each new reading into a bytes/sec rate against it.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::collector::{Sample, SampleKey};

// ---------------------------------------------------------------------------
// Delta helpers
// ---------------------------------------------------------------------------

/// Compute u64 delta, returning `None` on counter regression (daemon restart).
pub fn du64(curr: u64, prev: u64) -> Option<u64> {
    curr.checked_sub(prev)
}

// ---------------------------------------------------------------------------
// Counter state
// ---------------------------------------------------------------------------

/// Last-seen sample for every key.
///
/// Entries are replaced, never merged, and never evicted.
#[derive(Debug, Default)]
pub struct CounterState {
    prev_sample: HashMap<SampleKey, Sample>,
}

impl CounterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &SampleKey) -> Option<&Sample> {
        self.prev_sample.get(key)
    }

    /// Stores `sample` as the baseline for its key, returning the replaced one.
    pub fn put(&mut self, sample: Sample) -> Option<Sample> {
        self.prev_sample.insert(sample.key.clone(), sample)
    }

    pub fn len(&self) -> usize {
        self.prev_sample.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prev_sample.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Delta outcome
// ---------------------------------------------------------------------------

/// Why no rate could be computed for a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownReason {
    /// First reading for this key; it became the baseline.
    FirstSample,
    /// Timestamp did not advance past the stored one; sample was dropped.
    OutOfOrder,
    /// A cumulative counter went backwards; sample became the new baseline.
    CounterReset,
}

/// Result of applying one sample to the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeltaOutcome {
    Rate {
        /// Bytes read per second.
        read: f64,
        /// Bytes written per second.
        write: f64,
        /// Seconds between the two readings.
        interval: f64,
    },
    Unknown(UnknownReason),
}

impl DeltaOutcome {
    pub fn read_rate(&self) -> Option<f64> {
        match self {
            DeltaOutcome::Rate { read, .. } => Some(*read),
            DeltaOutcome::Unknown(_) => None,
        }
    }

    pub fn write_rate(&self) -> Option<f64> {
        match self {
            DeltaOutcome::Rate { write, .. } => Some(*write),
            DeltaOutcome::Unknown(_) => None,
        }
    }

    pub fn interval(&self) -> Option<f64> {
        match self {
            DeltaOutcome::Rate { interval, .. } => Some(*interval),
            DeltaOutcome::Unknown(_) => None,
        }
    }
}

/// Running totals of samples that did not yield a rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaStats {
    pub baselines: u64,
    pub out_of_order: u64,
    pub resets: u64,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Computes per-key throughput from successive cumulative readings.
#[derive(Debug, Default)]
pub struct DeltaEngine {
    state: CounterState,
    stats: DeltaStats,
}

impl DeltaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &CounterState {
        &self.state
    }

    pub fn stats(&self) -> DeltaStats {
        self.stats
    }

    /// Applies a new reading and returns the rate it implies.
    pub fn apply(&mut self, sample: Sample) -> DeltaOutcome {
        let Some(prev) = self.state.get(&sample.key) else {
            debug!(key = %sample.key, ts = %sample.timestamp, "baseline sample");
            self.stats.baselines += 1;
            self.state.put(sample);
            return DeltaOutcome::Unknown(UnknownReason::FirstSample);
        };

        let Some(dt) = sample.timestamp.secs_since(prev.timestamp) else {
            debug!(
                key = %sample.key,
                ts = %sample.timestamp,
                prev_ts = %prev.timestamp,
                "out-of-order sample rejected"
            );
            self.stats.out_of_order += 1;
            return DeltaOutcome::Unknown(UnknownReason::OutOfOrder);
        };

        let deltas = (
            du64(sample.bytes_read, prev.bytes_read),
            du64(sample.bytes_written, prev.bytes_written),
        );
        let outcome = match deltas {
            (Some(dr), Some(dw)) => DeltaOutcome::Rate {
                read: dr as f64 / dt,
                write: dw as f64 / dt,
                interval: dt,
            },
            _ => {
                info!(
                    key = %sample.key,
                    br = sample.bytes_read,
                    prev_br = prev.bytes_read,
                    bw = sample.bytes_written,
                    prev_bw = prev.bytes_written,
                    "counter regression, treating as reset"
                );
                self.stats.resets += 1;
                DeltaOutcome::Unknown(UnknownReason::CounterReset)
            }
        };

        self.state.put(sample);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Timestamp;

    fn sample(node: &str, fs: &str, secs: u64, br: u64, bw: u64) -> Sample {
        Sample {
            key: SampleKey::new(node, fs),
            cluster: "c1".to_string(),
            timestamp: Timestamp::from_parts(secs, 0),
            bytes_read: br,
            bytes_written: bw,
        }
    }

    #[test]
    fn test_first_sample_is_baseline() {
        let mut engine = DeltaEngine::new();
        let out = engine.apply(sample("n1", "fs1", 100, 10, 20));
        assert_eq!(out, DeltaOutcome::Unknown(UnknownReason::FirstSample));
        assert_eq!(out.read_rate(), None);
        assert_eq!(engine.state().len(), 1);
        assert_eq!(engine.stats().baselines, 1);
    }

    #[test]
    fn test_rates_computed_on_second_sample() {
        let mut engine = DeltaEngine::new();
        engine.apply(sample("n1", "fs1", 0, 100, 200));
        let out = engine.apply(sample("n1", "fs1", 1, 1100, 1700));
        assert!((out.read_rate().unwrap() - 1000.0).abs() < 1e-9);
        assert!((out.write_rate().unwrap() - 1500.0).abs() < 1e-9);
        assert!((out.interval().unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_subsecond_interval() {
        let mut engine = DeltaEngine::new();
        let mut a = sample("n1", "fs1", 10, 0, 0);
        a.timestamp = Timestamp::from_parts(10, 250_000);
        let mut b = sample("n1", "fs1", 10, 500, 0);
        b.timestamp = Timestamp::from_parts(10, 750_000);
        engine.apply(a);
        let out = engine.apply(b);
        assert!((out.read_rate().unwrap() - 1000.0).abs() < 1e-9);
        assert_eq!(out.write_rate(), Some(0.0));
    }

    #[test]
    fn test_counter_regression_yields_unknown_and_rebaselines() {
        let mut engine = DeltaEngine::new();
        engine.apply(sample("n1", "fs1", 0, 1000, 1000));
        let out = engine.apply(sample("n1", "fs1", 1, 50, 1200));
        assert_eq!(out, DeltaOutcome::Unknown(UnknownReason::CounterReset));
        assert_eq!(out.write_rate(), None);
        let stored = engine.state().get(&SampleKey::new("n1", "fs1")).unwrap();
        assert_eq!(stored.bytes_read, 50);
        assert_eq!(engine.stats().resets, 1);

        // Next cycle differences against the reset baseline.
        let out = engine.apply(sample("n1", "fs1", 2, 150, 1400));
        assert!((out.read_rate().unwrap() - 100.0).abs() < 1e-9);
        assert!((out.write_rate().unwrap() - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_order_rejected_state_unchanged() {
        let mut engine = DeltaEngine::new();
        engine.apply(sample("n1", "fs1", 10, 100, 100));

        let out = engine.apply(sample("n1", "fs1", 10, 900, 900));
        assert_eq!(out, DeltaOutcome::Unknown(UnknownReason::OutOfOrder));
        let out = engine.apply(sample("n1", "fs1", 9, 900, 900));
        assert_eq!(out, DeltaOutcome::Unknown(UnknownReason::OutOfOrder));

        let stored = engine.state().get(&SampleKey::new("n1", "fs1")).unwrap();
        assert_eq!(stored.timestamp, Timestamp::from_parts(10, 0));
        assert_eq!(stored.bytes_read, 100);
        assert_eq!(engine.stats().out_of_order, 2);
    }

    #[test]
    fn test_keys_are_independent() {
        let mut engine = DeltaEngine::new();
        engine.apply(sample("n1", "fs1", 0, 0, 0));
        let out = engine.apply(sample("n2", "fs1", 5, 100, 100));
        assert_eq!(out, DeltaOutcome::Unknown(UnknownReason::FirstSample));
        let out = engine.apply(sample("n1", "fs1", 2, 10, 0));
        assert!((out.read_rate().unwrap() - 5.0).abs() < 1e-9);
        assert_eq!(engine.state().len(), 2);
    }

    #[test]
    fn test_du64() {
        assert_eq!(du64(10, 3), Some(7));
        assert_eq!(du64(3, 3), Some(0));
        assert_eq!(du64(3, 10), None);
    }
}
