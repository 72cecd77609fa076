//! Application state for the TUI.

use chrono::{DateTime, Local};

use crate::config::ViewMode;
use crate::provider::{PollerStats, PollerStatus};
use crate::rates::DeltaStats;
use crate::table::IoTable;

/// Fixed facts about the session, shown in the header and waiting screen.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub host: String,
    pub nodes_label: String,
    pub node_count: usize,
    pub interval_secs: f64,
}

/// Mutable state driving the rendering.
#[derive(Debug)]
pub struct AppState {
    pub session: SessionInfo,
    pub view: ViewMode,
    /// Display frozen; data is still consumed.
    pub paused: bool,
    pub show_help: bool,
    pub help_scroll: usize,
    /// First visible body line of the flat view.
    pub scroll: usize,
    /// Table currently on screen.
    pub table: Option<IoTable>,
    /// Wall clock when `table` was put on screen.
    pub updated_at: Option<DateTime<Local>>,
    /// Rounds that arrived while paused.
    pub skipped_rounds: u64,
    pub source_status: PollerStatus,
    pub poller_stats: PollerStats,
    pub delta_stats: DeltaStats,
    pub terminal_height: u16,
    /// Transient message for the status line.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(session: SessionInfo, view: ViewMode) -> Self {
        Self {
            session,
            view,
            paused: false,
            show_help: false,
            help_scroll: 0,
            scroll: 0,
            table: None,
            updated_at: None,
            skipped_rounds: 0,
            source_status: PollerStatus::Collecting,
            poller_stats: PollerStats::default(),
            delta_stats: DeltaStats::default(),
            terminal_height: 0,
            status_message: None,
        }
    }

    /// Accepts a newly closed round unless the display is paused.
    pub fn apply_table(&mut self, table: IoTable, now: DateTime<Local>) {
        if self.paused {
            self.skipped_rounds += 1;
            return;
        }
        self.table = Some(table);
        self.updated_at = Some(now);
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        if !self.paused && self.skipped_rounds > 0 {
            self.status_message = Some(format!(
                "{} rounds arrived while paused, showing from the next one",
                self.skipped_rounds
            ));
            self.skipped_rounds = 0;
        }
    }

    pub fn cycle_view(&mut self) {
        self.view = self.view.next();
        self.scroll = 0;
        self.status_message = Some(format!("view: {}", self.view));
    }

    pub fn scroll_by(&mut self, delta: isize) {
        self.scroll = self.scroll.saturating_add_signed(delta);
    }

    /// Header label for the current source state.
    pub fn mode_label(&self) -> &'static str {
        if self.paused {
            return "PAUSED";
        }
        match self.source_status {
            PollerStatus::Collecting | PollerStatus::Live => "LIVE",
            PollerStatus::Stalled => "STALLED",
            PollerStatus::Finished => "ENDED",
        }
    }

    /// "Collecting initial data ..." text shown before the first round.
    pub fn waiting_message(&self) -> String {
        format!(
            "Collecting initial data for {} from {}. Wait {:.0}s.",
            self.session.nodes_label,
            self.session.host,
            self.session.interval_secs * 2.0
        )
    }
}
