//! Table builder: turns a closed round into sorted rows and aggregates.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::collector::Timestamp;
use crate::round::Round;
use crate::util::natural_cmp;

/// Per-key output row.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaRow {
    pub node: String,
    pub filesystem: String,
    /// Bytes read per second, `None` when unknown.
    pub read_rate: Option<f64>,
    /// Bytes written per second, `None` when unknown.
    pub write_rate: Option<f64>,
}

impl DeltaRow {
    pub fn is_known(&self) -> bool {
        self.read_rate.is_some() && self.write_rate.is_some()
    }
}

/// Summed rates over a group of rows.
///
/// Unknown rates add nothing but mark the sum as `partial`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    pub read: f64,
    pub write: f64,
    pub partial: bool,
}

impl Totals {
    pub fn add(&mut self, row: &DeltaRow) {
        match row.read_rate {
            Some(r) => self.read += r,
            None => self.partial = true,
        }
        match row.write_rate {
            Some(w) => self.write += w,
            None => self.partial = true,
        }
    }

    pub fn combined(&self) -> f64 {
        self.read + self.write
    }

    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Read => self.read,
            Metric::Write => self.write,
        }
    }
}

/// Which side of the I/O a value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Read,
    Write,
}

impl Metric {
    pub fn all() -> [Metric; 2] {
        [Metric::Read, Metric::Write]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Read => "Read",
            Metric::Write => "Write",
        }
    }

    pub fn short_label(&self) -> &'static str {
        match self {
            Metric::Read => "R",
            Metric::Write => "W",
        }
    }

    pub fn of(&self, row: &DeltaRow) -> Option<f64> {
        match self {
            Metric::Read => row.read_rate,
            Metric::Write => row.write_rate,
        }
    }
}

/// Subtotal for one filesystem across all nodes reporting it.
#[derive(Debug, Clone, PartialEq)]
pub struct FsTotal {
    pub filesystem: String,
    pub totals: Totals,
}

/// Total for one node across all of its filesystems.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTotal {
    pub node: String,
    pub totals: Totals,
}

/// Renderable result of one round.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IoTable {
    pub round: u64,
    /// Sorted by filesystem (natural order), then node (lexical).
    pub rows: Vec<DeltaRow>,
    /// Natural filesystem order.
    pub filesystems: Vec<FsTotal>,
    /// Lexical node order.
    pub nodes: Vec<NodeTotal>,
    pub total: Totals,
    /// Newest sample timestamp of the round.
    pub timestamp: Option<Timestamp>,
    /// Seconds the rates were averaged over.
    pub interval_secs: Option<f64>,
}

fn row_order(a: &DeltaRow, b: &DeltaRow) -> Ordering {
    natural_cmp(&a.filesystem, &b.filesystem).then_with(|| a.node.cmp(&b.node))
}

impl IoTable {
    /// Builds the table for a closed round.
    pub fn build(round: &Round) -> Self {
        let mut rows: Vec<DeltaRow> = round
            .entries
            .iter()
            .map(|e| DeltaRow {
                node: e.key.node.clone(),
                filesystem: e.key.filesystem.clone(),
                read_rate: e.outcome.read_rate(),
                write_rate: e.outcome.write_rate(),
            })
            .collect();
        rows.sort_by(row_order);

        let mut total = Totals::default();
        let mut fs_totals: Vec<FsTotal> = Vec::new();
        let mut node_totals: HashMap<&str, Totals> = HashMap::new();
        for row in &rows {
            total.add(row);
            // Rows are grouped by filesystem after sorting.
            match fs_totals.last_mut() {
                Some(last) if last.filesystem == row.filesystem => last.totals.add(row),
                _ => {
                    let mut totals = Totals::default();
                    totals.add(row);
                    fs_totals.push(FsTotal {
                        filesystem: row.filesystem.clone(),
                        totals,
                    });
                }
            }
            node_totals.entry(&row.node).or_default().add(row);
        }

        let mut nodes: Vec<NodeTotal> = node_totals
            .into_iter()
            .map(|(node, totals)| NodeTotal {
                node: node.to_string(),
                totals,
            })
            .collect();
        nodes.sort_by(|a, b| a.node.cmp(&b.node));

        Self {
            round: round.number,
            rows,
            filesystems: fs_totals,
            nodes,
            total,
            timestamp: round.latest_timestamp(),
            interval_secs: round.interval_secs(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when no row has a known rate yet (first round after start).
    pub fn is_baseline_only(&self) -> bool {
        !self
            .rows
            .iter()
            .any(|r| r.read_rate.is_some() || r.write_rate.is_some())
    }

    /// Looks up the row for a node/filesystem pair.
    pub fn row(&self, node: &str, filesystem: &str) -> Option<&DeltaRow> {
        self.rows
            .binary_search_by(|r| {
                natural_cmp(&r.filesystem, filesystem).then_with(|| r.node.as_str().cmp(node))
            })
            .ok()
            .map(|i| &self.rows[i])
    }

    pub fn node_total(&self, node: &str) -> Option<&Totals> {
        self.nodes
            .binary_search_by(|n| n.node.as_str().cmp(node))
            .ok()
            .map(|i| &self.nodes[i].totals)
    }

    pub fn responding_nodes(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::SampleKey;
    use crate::rates::{DeltaOutcome, UnknownReason};
    use crate::round::RoundEntry;

    fn entry(node: &str, fs: &str, rates: Option<(f64, f64)>) -> RoundEntry {
        RoundEntry {
            key: SampleKey::new(node, fs),
            timestamp: Timestamp::from_parts(100, 0),
            outcome: match rates {
                Some((read, write)) => DeltaOutcome::Rate {
                    read,
                    write,
                    interval: 3.0,
                },
                None => DeltaOutcome::Unknown(UnknownReason::FirstSample),
            },
        }
    }

    fn round(entries: Vec<RoundEntry>) -> Round {
        Round { number: 7, entries }
    }

    #[test]
    fn test_rows_sorted_naturally_then_by_node() {
        let t = IoTable::build(&round(vec![
            entry("n2", "fs10", Some((1.0, 1.0))),
            entry("n1", "fs2", Some((1.0, 1.0))),
            entry("n2", "fs1", Some((1.0, 1.0))),
            entry("n10", "fs1", Some((1.0, 1.0))),
            entry("n1", "fs10", Some((1.0, 1.0))),
        ]));
        let order: Vec<(&str, &str)> = t
            .rows
            .iter()
            .map(|r| (r.filesystem.as_str(), r.node.as_str()))
            .collect();
        assert_eq!(
            order,
            [
                ("fs1", "n10"),
                ("fs1", "n2"),
                ("fs2", "n1"),
                ("fs10", "n1"),
                ("fs10", "n2"),
            ]
        );
        let fs: Vec<&str> = t.filesystems.iter().map(|f| f.filesystem.as_str()).collect();
        assert_eq!(fs, ["fs1", "fs2", "fs10"]);
        assert_eq!(t.round, 7);
    }

    #[test]
    fn test_subtotals_and_grand_total() {
        let t = IoTable::build(&round(vec![
            entry("n1", "fs1", Some((1000.0, 0.0))),
            entry("n2", "fs1", Some((0.0, 2000.0))),
            entry("n1", "fs2", Some((10.0, 20.0))),
        ]));
        let fs1 = &t.filesystems[0].totals;
        assert_eq!((fs1.read, fs1.write, fs1.partial), (1000.0, 2000.0, false));
        assert_eq!(t.total.read, 1010.0);
        assert_eq!(t.total.write, 2020.0);
        assert_eq!(t.node_total("n1").unwrap().combined(), 1030.0);
        assert_eq!(t.responding_nodes(), 2);
        assert!(!t.is_baseline_only());
    }

    #[test]
    fn test_unknown_excluded_but_flagged() {
        let t = IoTable::build(&round(vec![
            entry("n1", "fs1", Some((500.0, 100.0))),
            entry("n2", "fs1", None),
            entry("n3", "fs2", Some((1.0, 1.0))),
        ]));
        let fs1 = &t.filesystems[0].totals;
        assert_eq!(fs1.read, 500.0);
        assert!(fs1.partial);
        assert!(!t.filesystems[1].totals.partial);
        assert!(t.total.partial);
        assert!(!t.row("n2", "fs1").unwrap().is_known());
    }

    #[test]
    fn test_row_lookup() {
        let t = IoTable::build(&round(vec![
            entry("b", "fs10", Some((3.0, 0.0))),
            entry("a", "fs2", Some((2.0, 0.0))),
        ]));
        assert_eq!(t.row("b", "fs10").unwrap().read_rate, Some(3.0));
        assert_eq!(t.row("a", "fs2").unwrap().read_rate, Some(2.0));
        assert!(t.row("a", "fs10").is_none());
    }

    #[test]
    fn test_baseline_only_round() {
        let t = IoTable::build(&round(vec![entry("n1", "fs1", None)]));
        assert!(t.is_baseline_only());
        assert_eq!(t.interval_secs, None);
        assert_eq!(t.timestamp, Some(Timestamp::from_parts(100, 0)));
    }
}
