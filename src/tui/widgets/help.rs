//! Help popup widget.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::config::ViewMode;

fn key_line(key: &str, desc: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<14}", key), Style::default().fg(Color::Yellow)),
        Span::styled(desc.to_string(), Style::default().fg(Color::White)),
    ])
}

fn section(title: &str) -> Line<'static> {
    Line::from(Span::styled(
        title.to_string(),
        Style::default().fg(Color::Cyan),
    ))
}

fn help_content(view: ViewMode) -> Vec<Line<'static>> {
    let mut lines = vec![
        section("Keys"),
        key_line("q, Esc, ^C", "quit"),
        key_line("Space, p", "pause / resume the display (data keeps flowing)"),
        key_line("v, Tab", "next view (flat, separated, interlaced)"),
        key_line("Up/Down, j/k", "scroll"),
        key_line("PgUp/PgDn", "scroll a page"),
        key_line("Home", "back to top"),
        key_line("?, h", "toggle this help"),
        Line::from(""),
        section("Reading the numbers"),
        Line::from("Rates are bytes per second with binary prefixes (K = 1024)."),
        Line::from("'-' means unknown: first sample of a node/filesystem, a"),
        Line::from("counter reset, or a sample older than the previous one."),
        Line::from("A round is only known to be complete when the next one"),
        Line::from("starts, so the display lags by up to one interval."),
        Line::from(""),
    ];
    match view {
        ViewMode::Flat => {
            lines.push(section("Flat view"));
            lines.push(Line::from("One row per filesystem and node, filesystems in"));
            lines.push(Line::from("natural order. '*' marks sums with unknown parts."));
        }
        ViewMode::Separated => {
            lines.push(section("Separated view"));
            lines.push(Line::from("Read and write matrices of active nodes, busiest"));
            lines.push(Line::from("first. Screen lines are shared fairly between them."));
        }
        ViewMode::Interlaced => {
            lines.push(section("Interlaced view"));
            lines.push(Line::from("R and W lines per active node, sorted by combined"));
            lines.push(Line::from("throughput."));
        }
    }
    lines
}

/// Renders the help popup centered on screen with scroll support.
pub fn render_help(frame: &mut Frame, area: Rect, view: ViewMode, scroll: &mut usize) {
    // 60% width, 80% height, clamped to 40-80 x 10-30
    let popup_width = (area.width * 60 / 100).clamp(40, 80).min(area.width);
    let popup_height = (area.height * 80 / 100).clamp(10, 30).min(area.height);

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let content = help_content(view);
    let content_lines = content.len();

    let block = Block::default()
        .title(format!(" {} help ", env!("CARGO_PKG_NAME")))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let chunks = Layout::vertical([
        Constraint::Min(1),    // Content
        Constraint::Length(1), // Footer
    ])
    .split(inner);

    let visible_height = chunks[0].height as usize;
    let max_scroll = content_lines.saturating_sub(visible_height);
    if *scroll > max_scroll {
        *scroll = max_scroll;
    }

    let paragraph = Paragraph::new(content)
        .wrap(Wrap { trim: false })
        .scroll((*scroll as u16, 0))
        .style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, chunks[0]);

    let scroll_info = if max_scroll > 0 {
        format!(" [{}/{}]", *scroll + 1, max_scroll + 1)
    } else {
        String::new()
    };
    let footer = Paragraph::new(format!(" Esc or ? to close{}", scroll_info))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[1]);
}
