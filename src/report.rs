//! Plain-text output: batch mode and the table printed on exit.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local};
use tracing::info;

use crate::config::ViewMode;
use crate::error::MonitorError;
use crate::provider::{PollUpdate, Poller};
use crate::table::IoTable;
use crate::view::build_view;

/// Upper bound on how long the batch loop blocks before checking for shutdown.
const POLL_TIMEOUT: Duration = Duration::from_millis(200);

/// "activity for 3.0s ending 0.4s ago", or a note for baseline rounds.
pub fn activity_line(table: &IoTable, now: DateTime<Local>) -> String {
    match (table.interval_secs, table.timestamp) {
        (Some(dt), Some(ts)) => {
            let now_micros = now.timestamp_micros().max(0) as u64;
            let age = now_micros.saturating_sub(ts.as_micros()) as f64 / 1e6;
            format!("activity for {dt:.1}s ending {age:.1}s ago")
        }
        _ => "baseline round, rates from the next one".to_string(),
    }
}

/// Renders `table` in `mode` as plain text, header included.
pub fn render_text(table: &IoTable, mode: ViewMode, now: DateTime<Local>) -> String {
    let mut out = format!(
        "{} [updated {}] round {}\n{}\n",
        env!("CARGO_PKG_NAME"),
        now.format("%Y-%m-%d %H:%M:%S"),
        table.round,
        activity_line(table, now)
    );
    for view in build_view(table, mode, usize::MAX) {
        out.push('\n');
        for line in view.to_text_lines() {
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}

/// Prints every closed round to `out` until the source ends or `shutdown` is set.
///
/// Returns the last table printed.
pub fn run_batch<W: Write>(
    poller: &mut Poller,
    mode: ViewMode,
    out: &mut W,
    shutdown: &AtomicBool,
) -> Result<Option<IoTable>, MonitorError> {
    let mut last = None;
    let result = loop {
        if shutdown.load(Ordering::SeqCst) {
            info!("shutdown signal received");
            break Ok(());
        }
        let update = match poller.poll(POLL_TIMEOUT) {
            Ok(update) => update,
            Err(e) => break Err(e),
        };
        let (table, done) = match update {
            Some(PollUpdate::Round(table)) => (Some(table), false),
            Some(PollUpdate::Finished(table)) => (table, true),
            None => (None, false),
        };
        if let Some(table) = table {
            if let Err(e) = write!(out, "{}", render_text(&table, mode, Local::now()))
                .and_then(|_| out.flush())
            {
                break Err(e.into());
            }
            last = Some(table);
        }
        if done {
            break Ok(());
        }
    };
    poller.shutdown();
    result.map(|()| last)
}
