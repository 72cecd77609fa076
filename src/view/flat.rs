//! Flat view: one row per (filesystem, node) with subtotals.

use crate::fmt::{FmtStyle, format_bytes_rate, format_total};
use crate::table::{IoTable, Totals};
use crate::view::common::{Align, RowStyleClass, TableViewModel, ViewCell, ViewRow};

const HEADERS: [&str; 4] = ["FILESYSTEM", "NODE", "READ/s", "WRITE/s"];

fn totals_row(filesystem: &str, label: &str, totals: &Totals, style: RowStyleClass) -> ViewRow {
    ViewRow::new(
        vec![
            ViewCell::plain(filesystem),
            ViewCell::plain(label),
            ViewCell::plain(format_total(totals.read, totals.partial, FmtStyle::Detail)),
            ViewCell::plain(format_total(totals.write, totals.partial, FmtStyle::Detail)),
        ],
        style,
    )
}

/// Builds the flat table. Each filesystem is followed by its subtotal; the
/// grand total comes last.
pub fn build_flat_view(table: &IoTable) -> TableViewModel {
    let mut rows = Vec::with_capacity(table.rows.len() + table.filesystems.len() + 1);
    let mut groups = table.filesystems.iter().peekable();

    for (i, row) in table.rows.iter().enumerate() {
        let style = if row.is_known() {
            RowStyleClass::Normal
        } else {
            RowStyleClass::Dimmed
        };
        rows.push(ViewRow::new(
            vec![
                ViewCell::plain(row.filesystem.as_str()),
                ViewCell::plain(row.node.as_str()),
                ViewCell::plain(format_bytes_rate(row.read_rate, FmtStyle::Detail)),
                ViewCell::plain(format_bytes_rate(row.write_rate, FmtStyle::Detail)),
            ],
            style,
        ));

        let group_ends = table
            .rows
            .get(i + 1)
            .is_none_or(|next| next.filesystem != row.filesystem);
        if group_ends && let Some(fs) = groups.next() {
            rows.push(totals_row(
                &fs.filesystem,
                "subtotal",
                &fs.totals,
                RowStyleClass::Subtotal,
            ));
        }
    }
    rows.push(totals_row("", "TOTAL", &table.total, RowStyleClass::Total));

    TableViewModel {
        title: format!(
            "Bytes/s for {} node/filesystem pairs on {} responding nodes",
            table.rows.len(),
            table.responding_nodes()
        ),
        headers: HEADERS.iter().map(|h| h.to_string()).collect(),
        aligns: vec![Align::Left, Align::Left, Align::Right, Align::Right],
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::DeltaRow;

    fn row(node: &str, fs: &str, r: Option<f64>, w: Option<f64>) -> DeltaRow {
        DeltaRow {
            node: node.to_string(),
            filesystem: fs.to_string(),
            read_rate: r,
            write_rate: w,
        }
    }

    fn io_table() -> IoTable {
        let rows = vec![
            row("n1", "fs1", Some(1024.0), Some(0.0)),
            row("n2", "fs1", None, None),
            row("n1", "fs2", Some(10.0), Some(20.0)),
        ];
        let mut t = IoTable {
            rows,
            ..IoTable::default()
        };
        let mut fs1 = Totals::default();
        fs1.add(&t.rows[0]);
        fs1.add(&t.rows[1]);
        let mut fs2 = Totals::default();
        fs2.add(&t.rows[2]);
        t.filesystems = vec![
            crate::table::FsTotal {
                filesystem: "fs1".into(),
                totals: fs1,
            },
            crate::table::FsTotal {
                filesystem: "fs2".into(),
                totals: fs2,
            },
        ];
        for r in &t.rows.clone() {
            t.total.add(r);
        }
        t
    }

    #[test]
    fn test_subtotal_after_each_filesystem() {
        let view = build_flat_view(&io_table());
        let labels: Vec<(&str, &str)> = view
            .rows
            .iter()
            .map(|r| (r.cells[0].text.as_str(), r.cells[1].text.as_str()))
            .collect();
        assert_eq!(
            labels,
            [
                ("fs1", "n1"),
                ("fs1", "n2"),
                ("fs1", "subtotal"),
                ("fs2", "n1"),
                ("fs2", "subtotal"),
                ("", "TOTAL"),
            ]
        );
        assert_eq!(view.rows[2].style, RowStyleClass::Subtotal);
        assert_eq!(view.rows[5].style, RowStyleClass::Total);
    }

    #[test]
    fn test_unknown_and_partial_rendering() {
        let view = build_flat_view(&io_table());
        assert_eq!(view.rows[0].cells[2].text, "1.0 KiB/s");
        assert_eq!(view.rows[1].cells[2].text, "-");
        assert_eq!(view.rows[1].style, RowStyleClass::Dimmed);
        assert_eq!(view.rows[2].cells[2].text, "1.0 KiB/s*");
        assert_eq!(view.rows[4].cells[3].text, "20 B/s");
    }
}
