//! Header widget showing program, update time, mode and view, plus the status line.

use chrono::Local;
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::fmt::format_secs;
use crate::report::activity_line;
use crate::tui::state::AppState;
use crate::tui::style::Styles;

/// Renders the header bar.
pub fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
    let chunks = Layout::horizontal([
        Constraint::Length(8),  // Name
        Constraint::Length(30), // Updated
        Constraint::Length(10), // Mode
        Constraint::Min(20),    // View / source
    ])
    .split(area);

    let name = Paragraph::new(format!(" {} ", env!("CARGO_PKG_NAME"))).style(Styles::header());
    frame.render_widget(name, chunks[0]);

    let updated = state
        .updated_at
        .map(|dt| format!("updated {}", dt.format("%Y-%m-%d %H:%M:%S")))
        .unwrap_or_else(|| "waiting for data".to_string());
    frame.render_widget(Paragraph::new(updated).style(Styles::header()), chunks[1]);

    let label = state.mode_label();
    let mode_style = match label {
        "LIVE" => Styles::live(),
        "PAUSED" => Styles::paused(),
        _ => Styles::critical(),
    };
    frame.render_widget(
        Paragraph::new(format!(" {} ", label)).style(mode_style),
        chunks[2],
    );

    let view = Line::from(vec![
        Span::styled(" view: ", Styles::header()),
        Span::styled(state.view.name(), Styles::header()),
        Span::styled(
            format!(
                "  {} nodes @ {}  every {}",
                state.session.node_count,
                state.session.host,
                format_secs(state.session.interval_secs)
            ),
            Styles::header(),
        ),
    ]);
    frame.render_widget(Paragraph::new(view).style(Styles::header()), chunks[3]);
}

/// Text of the status line under the header.
pub fn status_text(state: &AppState) -> String {
    if let Some(msg) = &state.status_message {
        return msg.clone();
    }
    let Some(table) = &state.table else {
        return state.waiting_message();
    };

    let mut parts = vec![activity_line(table, Local::now())];
    parts.push(format!("round {}", table.round));
    parts.push(format!("{} responding", table.responding_nodes()));

    let p = &state.poller_stats;
    let d = &state.delta_stats;
    if p.malformed > 0 {
        parts.push(format!("{} malformed", p.malformed));
    }
    if d.out_of_order > 0 {
        parts.push(format!("{} out-of-order", d.out_of_order));
    }
    if d.resets > 0 {
        parts.push(format!("{} resets", d.resets));
    }
    if p.stalls > 0 {
        parts.push(format!("{} stalls", p.stalls));
    }
    parts.join(" | ")
}

/// Renders the status line.
pub fn render_status(frame: &mut Frame, area: Rect, state: &AppState) {
    let style = if state.status_message.is_some() {
        Styles::title()
    } else {
        Styles::dim()
    };
    frame.render_widget(Paragraph::new(status_text(state)).style(style), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Timestamp;
    use crate::config::ViewMode;
    use crate::provider::PollerStats;
    use crate::table::IoTable;
    use crate::tui::state::SessionInfo;

    fn state() -> AppState {
        AppState::new(
            SessionInfo {
                host: "localhost".into(),
                nodes_label: "default nodeset".into(),
                node_count: 2,
                interval_secs: 3.0,
            },
            ViewMode::Flat,
        )
    }

    #[test]
    fn test_status_before_first_round() {
        assert!(status_text(&state()).starts_with("Collecting initial data"));
    }

    #[test]
    fn test_status_with_counters() {
        let mut s = state();
        s.apply_table(
            IoTable {
                round: 4,
                interval_secs: Some(3.0),
                timestamp: Some(Timestamp::from_micros(0)),
                ..IoTable::default()
            },
            Local::now(),
        );
        s.poller_stats = PollerStats {
            malformed: 2,
            ..PollerStats::default()
        };
        s.delta_stats.resets = 1;
        let text = status_text(&s);
        assert!(text.starts_with("activity for 3.0s ending "), "{text}");
        assert!(text.contains("round 4"), "{text}");
        assert!(text.contains("2 malformed"), "{text}");
        assert!(text.contains("1 resets"), "{text}");
        assert!(!text.contains("out-of-order"), "{text}");
    }
}
