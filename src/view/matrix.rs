//! Node × filesystem matrix views.
//!
//! Only active nodes are listed, busiest first. When the screen is too small
//! the tail of the list is cut, and the title says how many were shown.

use crate::fmt::{COMPACT_WIDTH, FmtStyle, center, format_bytes_rate, format_total, pad_right};
use crate::table::{IoTable, Metric, Totals};
use crate::view::common::{Align, RowStyleClass, TableViewModel, ViewCell, ViewRow};

/// Lines a separated matrix needs besides its node rows
/// (title, header, rule, total row, blank separator).
pub const SEPARATED_OVERHEAD: usize = 5;

/// Lines the interlaced matrix needs besides its node rows
/// (title, header, rule, two total rows).
pub const INTERLACED_OVERHEAD: usize = 5;

/// Max-min fair split of `available` units among `demands`.
///
/// Units are handed out one at a time, round-robin over the demands ordered
/// from largest to smallest, skipping those already satisfied. No share
/// exceeds its demand, and the result keeps the order of `demands`.
pub fn max_min_fair(available: usize, demands: &[usize]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..demands.len()).collect();
    order.sort_by(|&a, &b| demands[b].cmp(&demands[a]).then(a.cmp(&b)));

    let mut shares = vec![0usize; demands.len()];
    let mut left = available;
    let mut progressed = true;
    while left > 0 && progressed {
        progressed = false;
        for &i in &order {
            if left == 0 {
                break;
            }
            if shares[i] < demands[i] {
                shares[i] += 1;
                left -= 1;
                progressed = true;
            }
        }
    }
    shares
}

/// Nodes with a positive value of `key`, largest first, ties by name.
fn active_nodes<F>(table: &IoTable, key: F) -> Vec<(&str, Totals)>
where
    F: Fn(&Totals) -> f64,
{
    let mut nodes: Vec<(&str, Totals)> = table
        .nodes
        .iter()
        .filter(|n| key(&n.totals) > 0.0)
        .map(|n| (n.node.as_str(), n.totals))
        .collect();
    nodes.sort_by(|a, b| key(&b.1).total_cmp(&key(&a.1)).then(a.0.cmp(b.0)));
    nodes
}

/// Width of the node column, sized over every responding node so it does not
/// jump around as activity changes.
fn label_width(table: &IoTable) -> usize {
    table
        .nodes
        .iter()
        .map(|n| n.node.chars().count())
        .max()
        .unwrap_or(1)
        .max("Total".len())
}

fn fs_headers(table: &IoTable) -> Vec<String> {
    table
        .filesystems
        .iter()
        .map(|fs| format!("{:>width$}", fs.filesystem, width = COMPACT_WIDTH))
        .collect()
}

fn rate_cells(table: &IoTable, node: &str, metric: Metric) -> Vec<ViewCell> {
    table
        .filesystems
        .iter()
        .map(|fs| {
            let rate = table.row(node, &fs.filesystem).and_then(|r| metric.of(r));
            ViewCell::plain(format_bytes_rate(rate, FmtStyle::Compact))
        })
        .collect()
}

fn total_cells(table: &IoTable, metric: Metric) -> Vec<ViewCell> {
    std::iter::once(&table.total)
        .chain(table.filesystems.iter().map(|fs| &fs.totals))
        .map(|t| ViewCell::plain(format_total(t.get(metric), t.partial, FmtStyle::Compact)))
        .collect()
}

/// Two matrices, read then write, sharing `available_lines` fairly.
pub fn build_separated_view(table: &IoTable, available_lines: usize) -> Vec<TableViewModel> {
    let metrics = Metric::all();
    let active: Vec<Vec<(&str, Totals)>> = metrics
        .iter()
        .map(|&m| active_nodes(table, |t| t.get(m)))
        .collect();
    let demands: Vec<usize> = active.iter().map(Vec::len).collect();
    let budget = available_lines.saturating_sub(SEPARATED_OVERHEAD * metrics.len());
    let shares = max_min_fair(budget, &demands);

    let width = label_width(table);
    let mut headers = vec!["Node".to_string(), "Total".to_string()];
    headers.extend(fs_headers(table));
    let aligns: Vec<Align> = std::iter::once(Align::Left)
        .chain(std::iter::repeat_n(Align::Right, headers.len() - 1))
        .collect();

    metrics
        .iter()
        .zip(active.iter().zip(&shares))
        .map(|(&metric, (nodes, &share))| {
            let mut rows = Vec::with_capacity(share + 1);
            let mut cells = vec![ViewCell::plain(center("Total", width, '*'))];
            cells.extend(total_cells(table, metric));
            rows.push(ViewRow::new(cells, RowStyleClass::Total));

            for (node, totals) in nodes.iter().take(share) {
                let mut cells = vec![
                    ViewCell::plain(pad_right(node, width, '.')),
                    ViewCell::plain(format_bytes_rate(Some(totals.get(metric)), FmtStyle::Compact)),
                ];
                cells.extend(rate_cells(table, node, metric));
                rows.push(ViewRow::new(cells, RowStyleClass::Normal));
            }

            TableViewModel {
                title: format!(
                    "{} bytes/s for top {} of {} active nodes out of {} responding",
                    metric.label(),
                    share.min(nodes.len()),
                    nodes.len(),
                    table.responding_nodes()
                ),
                headers: headers.clone(),
                aligns: aligns.clone(),
                rows,
            }
        })
        .collect()
}

/// One matrix with a read and a write line per active node.
pub fn build_interlaced_view(table: &IoTable, available_lines: usize) -> TableViewModel {
    let nodes = active_nodes(table, Totals::combined);
    let max_nodes = available_lines.saturating_sub(INTERLACED_OVERHEAD) / Metric::all().len();
    let width = label_width(table);

    let mut headers = vec!["Node".to_string(), "Type".to_string(), "Total".to_string()];
    headers.extend(fs_headers(table));
    let aligns: Vec<Align> = [Align::Left, Align::Left]
        .into_iter()
        .chain(std::iter::repeat_n(Align::Right, headers.len() - 2))
        .collect();

    let mut rows = Vec::new();
    for (i, metric) in Metric::all().into_iter().enumerate() {
        let label = if i == 0 {
            center("Total", width, '*')
        } else {
            String::new()
        };
        let mut cells = vec![ViewCell::plain(label), ViewCell::plain(metric.short_label())];
        cells.extend(total_cells(table, metric));
        rows.push(ViewRow::new(cells, RowStyleClass::Total));
    }

    let shown = nodes.len().min(max_nodes);
    for (node, totals) in nodes.iter().take(shown) {
        for (i, metric) in Metric::all().into_iter().enumerate() {
            let label = if i == 0 {
                pad_right(node, width, '.')
            } else {
                String::new()
            };
            let mut cells = vec![
                ViewCell::plain(label),
                ViewCell::plain(metric.short_label()),
                ViewCell::plain(format_bytes_rate(Some(totals.get(metric)), FmtStyle::Compact)),
            ];
            cells.extend(rate_cells(table, node, metric));
            rows.push(ViewRow::new(cells, RowStyleClass::Normal));
        }
    }

    TableViewModel {
        title: format!(
            "Bytes/s for top {} of {} active nodes out of {} responding",
            shown,
            nodes.len(),
            table.responding_nodes()
        ),
        headers,
        aligns,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{SampleKey, Timestamp};
    use crate::rates::DeltaOutcome;
    use crate::round::{Round, RoundEntry};

    fn entry(node: &str, fs: &str, read: f64, write: f64) -> RoundEntry {
        RoundEntry {
            key: SampleKey::new(node, fs),
            timestamp: Timestamp::from_parts(1, 0),
            outcome: DeltaOutcome::Rate {
                read,
                write,
                interval: 1.0,
            },
        }
    }

    fn io_table() -> IoTable {
        IoTable::build(&Round {
            number: 2,
            entries: vec![
                entry("n1", "fs1", 1000.0, 0.0),
                entry("n2", "fs1", 0.0, 2000.0),
                entry("node3", "fs2", 5000.0, 10.0),
                entry("n4", "fs2", 0.0, 0.0),
            ],
        })
    }

    #[test]
    fn test_max_min_fair() {
        assert_eq!(max_min_fair(10, &[3, 20]), [3, 7]);
        assert_eq!(max_min_fair(5, &[4, 4]), [3, 2]);
        assert_eq!(max_min_fair(5, &[4, 6]), [2, 3]);
        assert_eq!(max_min_fair(100, &[1, 2]), [1, 2]);
        assert_eq!(max_min_fair(0, &[5, 5]), [0, 0]);
        assert_eq!(max_min_fair(3, &[]), Vec::<usize>::new());
    }

    #[test]
    fn test_separated_lists_active_nodes_busiest_first() {
        let views = build_separated_view(&io_table(), 100);
        assert_eq!(views.len(), 2);

        let read = &views[0];
        assert_eq!(
            read.title,
            "Read bytes/s for top 2 of 2 active nodes out of 4 responding"
        );
        let labels: Vec<&str> = read.rows.iter().map(|r| r.cells[0].text.as_str()).collect();
        assert_eq!(labels, ["Total", "node3", "n1..."]);
        assert_eq!(read.headers, ["Node", "Total", "   fs1", "   fs2"]);
        // n1 has no fs2 record.
        assert_eq!(read.rows[2].cells[3].text, "  -   ");

        let write = &views[1];
        let labels: Vec<&str> = write.rows.iter().map(|r| r.cells[0].text.as_str()).collect();
        assert_eq!(labels, ["Total", "n2...", "node3"]);
    }

    #[test]
    fn test_separated_truncates_to_fit() {
        // Ten lines of overhead plus one node line to share.
        let views = build_separated_view(&io_table(), 11);
        assert_eq!(
            views[0].title,
            "Read bytes/s for top 1 of 2 active nodes out of 4 responding"
        );
        assert_eq!(views[0].rows.len(), 2);
        assert_eq!(views[1].rows.len(), 1);
    }

    #[test]
    fn test_interlaced_rows() {
        let view = build_interlaced_view(&io_table(), 9);
        // Two node slots: node3 (5010) then n2 (2000).
        assert_eq!(
            view.title,
            "Bytes/s for top 2 of 3 active nodes out of 4 responding"
        );
        let labels: Vec<(&str, &str)> = view
            .rows
            .iter()
            .map(|r| (r.cells[0].text.as_str(), r.cells[1].text.as_str()))
            .collect();
        assert_eq!(
            labels,
            [
                ("Total", "R"),
                ("", "W"),
                ("node3", "R"),
                ("", "W"),
                ("n2...", "R"),
                ("", "W"),
            ]
        );
        assert_eq!(view.rows[0].cells[2].text, "  5.9K");
    }
}
