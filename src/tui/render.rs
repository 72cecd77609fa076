//! Main rendering logic for TUI.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};

use super::state::AppState;
use super::widgets::{render_header, render_help, render_status, render_tables};

/// Main render function.
pub fn render(frame: &mut Frame, state: &mut AppState) {
    let area = frame.area();
    state.terminal_height = area.height;

    let chunks = Layout::vertical([
        Constraint::Length(1), // Header
        Constraint::Length(1), // Status
        Constraint::Min(3),    // Tables
    ])
    .split(area);

    render_header(frame, chunks[0], state);
    render_status(frame, chunks[1], state);
    render_tables(frame, chunks[2], state);

    // Help popup (rendered last to overlay everything)
    if state.show_help {
        render_help(frame, area, state.view, &mut state.help_scroll);
    }
}
