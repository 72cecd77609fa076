//! UI-agnostic view model types.
//!
//! These types carry presentation data without any dependency on ratatui.
//! The TUI maps them to styles; the batch printer renders them as plain text.

/// Row-level style classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowStyleClass {
    #[default]
    Normal,
    /// Per-filesystem subtotal (TUI: bold).
    Subtotal,
    /// Grand total (TUI: header colors).
    Total,
    /// Row without known rates (TUI: dark gray).
    Dimmed,
}

/// Horizontal alignment of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// A single table cell with optional per-cell style override.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewCell {
    pub text: String,
    /// `None` = inherit row style.
    pub style: Option<RowStyleClass>,
}

impl ViewCell {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: None,
        }
    }

    pub fn styled(text: impl Into<String>, style: RowStyleClass) -> Self {
        Self {
            text: text.into(),
            style: Some(style),
        }
    }
}

/// One table row.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRow {
    pub cells: Vec<ViewCell>,
    pub style: RowStyleClass,
}

impl ViewRow {
    pub fn new(cells: Vec<ViewCell>, style: RowStyleClass) -> Self {
        Self { cells, style }
    }
}

/// Complete table ready to be rendered by any frontend.
#[derive(Debug, Clone, PartialEq)]
pub struct TableViewModel {
    pub title: String,
    pub headers: Vec<String>,
    pub aligns: Vec<Align>,
    pub rows: Vec<ViewRow>,
}

impl TableViewModel {
    /// Width of each column: the widest of header and cells.
    pub fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.cells.iter().enumerate() {
                let len = cell.text.chars().count();
                match widths.get_mut(i) {
                    Some(w) => *w = (*w).max(len),
                    None => widths.push(len),
                }
            }
        }
        widths
    }

    /// Renders the table as aligned plain text, title first.
    pub fn to_text_lines(&self) -> Vec<String> {
        let widths = self.column_widths();
        let mut lines = Vec::with_capacity(self.rows.len() + 3);
        lines.push(format!("{}:", self.title));
        lines.push(self.join(self.headers.iter().map(String::as_str), &widths));
        lines.push(
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join(" "),
        );
        for row in &self.rows {
            lines.push(self.join(row.cells.iter().map(|c| c.text.as_str()), &widths));
        }
        lines
    }

    fn join<'a>(&self, cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
        let parts: Vec<String> = cells
            .zip(widths)
            .enumerate()
            .map(|(i, (text, width))| match self.aligns.get(i) {
                Some(Align::Left) => format!("{:<width$}", text, width = *width),
                _ => format!("{:>width$}", text, width = *width),
            })
            .collect();
        parts.join(" ").trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_alignment() {
        let table = TableViewModel {
            title: "Demo".to_string(),
            headers: vec!["Node".to_string(), "Total".to_string()],
            aligns: vec![Align::Left, Align::Right],
            rows: vec![
                ViewRow::new(
                    vec![ViewCell::plain("n1"), ViewCell::plain("1.0K")],
                    RowStyleClass::Normal,
                ),
                ViewRow::new(
                    vec![ViewCell::plain("node10"), ViewCell::plain("3")],
                    RowStyleClass::Normal,
                ),
            ],
        };
        assert_eq!(table.column_widths(), [6, 5]);
        assert_eq!(
            table.to_text_lines(),
            [
                "Demo:",
                "Node   Total",
                "------ -----",
                "n1      1.0K",
                "node10     3",
            ]
        );
    }
}
