//! Body widget: renders view-model tables as styled, aligned lines.

use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::state::AppState;
use crate::tui::style::Styles;
use crate::view::{Align, TableViewModel, build_view};

fn pad(text: &str, width: usize, align: Align) -> String {
    match align {
        Align::Left => format!("{:<width$}", text),
        Align::Right => format!("{:>width$}", text),
    }
}

/// Styled lines for one table: title, header, then rows.
pub fn table_lines(table: &TableViewModel) -> Vec<Line<'static>> {
    let widths = table.column_widths();
    let align = |i: usize| table.aligns.get(i).copied().unwrap_or(Align::Right);

    let mut lines = Vec::with_capacity(table.rows.len() + 2);
    lines.push(Line::from(Span::styled(
        format!("{}:", table.title),
        Styles::title(),
    )));

    let header: Vec<String> = table
        .headers
        .iter()
        .enumerate()
        .map(|(i, h)| pad(h, widths[i], align(i)))
        .collect();
    lines.push(Line::from(Span::styled(header.join(" "), Styles::table_header())));

    for row in &table.rows {
        let mut spans = Vec::with_capacity(row.cells.len() * 2);
        for (i, cell) in row.cells.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(" "));
            }
            let style = Styles::row(cell.style.unwrap_or(row.style));
            let width = widths.get(i).copied().unwrap_or(0);
            spans.push(Span::styled(pad(&cell.text, width, align(i)), style));
        }
        lines.push(Line::from(spans));
    }
    lines
}

/// Renders the current view, or the waiting message before the first round.
pub fn render_tables(frame: &mut Frame, area: Rect, state: &mut AppState) {
    let Some(table) = &state.table else {
        let waiting = Paragraph::new(vec![Line::from(""), Line::from(state.waiting_message())])
            .alignment(Alignment::Center)
            .style(Styles::dim());
        frame.render_widget(waiting, area);
        return;
    };

    let views = build_view(table, state.view, area.height as usize);
    let mut lines: Vec<Line> = Vec::new();
    for (i, view) in views.iter().enumerate() {
        if i > 0 {
            lines.push(Line::from(""));
        }
        lines.extend(table_lines(view));
    }

    let max_scroll = lines.len().saturating_sub(area.height as usize);
    if state.scroll > max_scroll {
        state.scroll = max_scroll;
    }
    let paragraph = Paragraph::new(lines)
        .scroll((state.scroll.min(u16::MAX as usize) as u16, 0))
        .style(Styles::default());
    frame.render_widget(paragraph, area);
}
