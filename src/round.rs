//! Grouping of the sample stream into polling rounds.
//!
//! mmpmon never marks the end of a round. Each key is reported at most once
//! per round, so the first repeat of a key already seen in the open round
//! proves that the next round has started. The open round is closed at that
//! moment, which is why the displayed data always lags one refresh interval
//! behind the newest line read.

use std::collections::HashSet;

use tracing::trace;

use crate::collector::{Sample, SampleKey, Timestamp};
use crate::rates::{DeltaEngine, DeltaOutcome};

/// One sample of a round together with the rate computed for it.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundEntry {
    pub key: SampleKey,
    pub timestamp: Timestamp,
    pub outcome: DeltaOutcome,
}

/// A closed polling round.
#[derive(Debug, Clone, PartialEq)]
pub struct Round {
    /// Sequence number, starting at 1.
    pub number: u64,
    /// Entries in arrival order; keys are unique.
    pub entries: Vec<RoundEntry>,
}

impl Round {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Timestamp of the newest sample in the round.
    pub fn latest_timestamp(&self) -> Option<Timestamp> {
        self.entries.iter().map(|e| e.timestamp).max()
    }

    /// Longest interval any rate in this round was computed over.
    pub fn interval_secs(&self) -> Option<f64> {
        self.entries
            .iter()
            .filter_map(|e| e.outcome.interval())
            .reduce(f64::max)
    }

    pub fn has_rates(&self) -> bool {
        self.entries
            .iter()
            .any(|e| matches!(e.outcome, DeltaOutcome::Rate { .. }))
    }
}

/// Consumes samples, routes them to the [`DeltaEngine`], and emits a
/// [`Round`] whenever the key-repetition boundary is seen.
#[derive(Debug, Default)]
pub struct RoundAssembler {
    engine: DeltaEngine,
    seen: HashSet<SampleKey>,
    open: Vec<RoundEntry>,
    closed_rounds: u64,
}

impl RoundAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engine(&self) -> &DeltaEngine {
        &self.engine
    }

    pub fn closed_rounds(&self) -> u64 {
        self.closed_rounds
    }

    /// Adds a sample. Returns the previous round if this sample started a new one.
    pub fn push(&mut self, sample: Sample) -> Option<Round> {
        let closed = if self.seen.contains(&sample.key) {
            trace!(key = %sample.key, "key repeated, closing round");
            self.close()
        } else {
            None
        };

        self.seen.insert(sample.key.clone());
        let key = sample.key.clone();
        let timestamp = sample.timestamp;
        let outcome = self.engine.apply(sample);
        self.open.push(RoundEntry {
            key,
            timestamp,
            outcome,
        });

        closed
    }

    /// Closes the open round, if it has any samples. Used at end of stream.
    pub fn finish(&mut self) -> Option<Round> {
        self.close()
    }

    fn close(&mut self) -> Option<Round> {
        if self.open.is_empty() {
            return None;
        }
        self.seen.clear();
        self.closed_rounds += 1;
        Some(Round {
            number: self.closed_rounds,
            entries: std::mem::take(&mut self.open),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::UnknownReason;

    fn sample(node: &str, fs: &str, secs: u64, br: u64, bw: u64) -> Sample {
        Sample {
            key: SampleKey::new(node, fs),
            cluster: "c1".to_string(),
            timestamp: Timestamp::from_parts(secs, 0),
            bytes_read: br,
            bytes_written: bw,
        }
    }

    fn keys(round: &Round) -> Vec<String> {
        round.entries.iter().map(|e| e.key.to_string()).collect()
    }

    #[test]
    fn test_two_rounds_of_three_keys() {
        let mut asm = RoundAssembler::new();
        let mut rounds = Vec::new();
        for (i, node) in ["a", "b", "c", "a", "b", "c"].iter().enumerate() {
            let secs = (i / 3) as u64;
            let closed = asm.push(sample(node, "fs1", secs, 0, 0));
            if i == 3 {
                assert!(closed.is_some(), "second 'a' must close round 1");
            } else {
                assert!(closed.is_none());
            }
            rounds.extend(closed);
        }
        rounds.extend(asm.finish());

        assert_eq!(rounds.len(), 2);
        assert_eq!(keys(&rounds[0]), ["a/fs1", "b/fs1", "c/fs1"]);
        assert_eq!(keys(&rounds[1]), ["a/fs1", "b/fs1", "c/fs1"]);
        assert_eq!(rounds[0].number, 1);
        assert_eq!(rounds[1].number, 2);
        assert!(asm.finish().is_none());
    }

    #[test]
    fn test_first_round_has_no_rates() {
        let mut asm = RoundAssembler::new();
        asm.push(sample("a", "fs1", 0, 0, 0));
        asm.push(sample("b", "fs1", 0, 0, 0));
        let round = asm.push(sample("a", "fs1", 1, 10, 10)).unwrap();
        assert!(!round.has_rates());
        assert!(round.entries.iter().all(|e| {
            e.outcome == DeltaOutcome::Unknown(UnknownReason::FirstSample)
        }));
        assert_eq!(asm.finish().map(|r| r.len()), Some(1));
    }

    #[test]
    fn test_round_size_may_change() {
        let mut asm = RoundAssembler::new();
        for n in ["a", "b", "c"] {
            asm.push(sample(n, "fs1", 0, 0, 0));
        }
        // 'c' went inactive, a new filesystem appeared on 'a'.
        let r1 = asm.push(sample("a", "fs1", 3, 30, 0)).unwrap();
        asm.push(sample("a", "fs2", 3, 0, 0));
        asm.push(sample("b", "fs1", 3, 0, 0));
        let r2 = asm.push(sample("a", "fs1", 6, 60, 0)).unwrap();

        assert_eq!(r1.len(), 3);
        assert_eq!(keys(&r2), ["a/fs1", "a/fs2", "b/fs1"]);
        assert!((r2.entries[0].outcome.read_rate().unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(r2.entries[1].outcome.read_rate(), None);
        assert_eq!(r2.interval_secs(), Some(3.0));
        assert_eq!(r2.latest_timestamp(), Some(Timestamp::from_parts(3, 0)));
    }

    #[test]
    fn test_finish_on_empty() {
        let mut asm = RoundAssembler::new();
        assert!(asm.finish().is_none());
        assert_eq!(asm.closed_rounds(), 0);
    }
}
