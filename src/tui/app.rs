//! Main TUI application.

use std::io::{self, Stdout};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Local;
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::{debug, info};

use crate::config::ViewMode;
use crate::error::MonitorError;
use crate::provider::{PollUpdate, Poller};
use crate::table::IoTable;

use super::event::{Event, EventHandler};
use super::input::{KeyAction, handle_key};
use super::render::render;
use super::state::AppState;

/// How often the loop wakes up without input.
const TICK_RATE: Duration = Duration::from_millis(200);

type Backend = CrosstermBackend<Stdout>;

/// Leaves raw mode and the alternate screen. Errors are ignored so it can run
/// from a panic hook.
fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
}

type PanicHook = Box<dyn Fn(&std::panic::PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Runs `restore` before the previous panic hook while alive; puts the
/// previous hook back on drop.
struct RestoreOnPanic {
    previous: Arc<PanicHook>,
}

impl RestoreOnPanic {
    fn install(restore: impl Fn() + Sync + Send + 'static) -> Self {
        let previous: Arc<PanicHook> = Arc::new(std::panic::take_hook());
        let chained = Arc::clone(&previous);
        std::panic::set_hook(Box::new(move |info| {
            restore();
            chained(info);
        }));
        Self { previous }
    }
}

impl Drop for RestoreOnPanic {
    fn drop(&mut self) {
        // set_hook panics when called from a panicking thread.
        if std::thread::panicking() {
            return;
        }
        let previous = Arc::clone(&self.previous);
        std::panic::set_hook(Box::new(move |info| previous(info)));
    }
}

/// Main TUI application.
pub struct App {
    poller: Poller,
    state: AppState,
    should_quit: bool,
    /// Set by the Ctrl-C / SIGTERM handler.
    shutdown: Arc<AtomicBool>,
}

impl App {
    /// Creates a new App around an already started poller.
    pub fn new(poller: Poller, state: AppState, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            poller,
            state,
            should_quit: false,
            shutdown,
        }
    }

    /// Runs the TUI until the user quits or the source fails.
    pub fn run(&mut self) -> Result<(), MonitorError> {
        enable_raw_mode().map_err(MonitorError::Terminal)?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            restore_terminal();
            return Err(MonitorError::Terminal(e));
        }
        let mut terminal = match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(t) => t,
            Err(e) => {
                restore_terminal();
                return Err(MonitorError::Terminal(e));
            }
        };

        let hook = RestoreOnPanic::install(restore_terminal);
        let result = self.run_loop(&mut terminal);
        drop(hook);

        restore_terminal();
        let _ = terminal.show_cursor();
        self.poller.shutdown();

        result
    }

    /// Table that was on screen last, if any round completed.
    pub fn last_table(&self) -> Option<&IoTable> {
        self.state.table.as_ref()
    }

    /// View selected when the loop ended.
    pub fn view(&self) -> ViewMode {
        self.state.view
    }

    fn run_loop(&mut self, terminal: &mut Terminal<Backend>) -> Result<(), MonitorError> {
        let events = EventHandler::new(TICK_RATE);
        if let Ok(size) = terminal.size() {
            self.state.terminal_height = size.height;
        }

        loop {
            self.pump()?;
            terminal
                .draw(|frame| render(frame, &mut self.state))
                .map_err(MonitorError::Terminal)?;

            match events.next() {
                Ok(Event::Tick) => {}
                Ok(Event::Key(key)) => {
                    if handle_key(&mut self.state, key) == KeyAction::Quit {
                        self.should_quit = true;
                    }
                }
                Ok(Event::Resize(_, height)) => {
                    debug!(height, "terminal resized");
                    self.state.terminal_height = height;
                }
                Err(_) => self.should_quit = true,
            }

            if self.shutdown.load(Ordering::SeqCst) {
                info!("shutdown signal received");
                self.should_quit = true;
            }
            if self.should_quit {
                return Ok(());
            }
        }
    }

    /// Moves queued source output into the state.
    fn pump(&mut self) -> Result<(), MonitorError> {
        if self.poller.is_finished() {
            return Ok(());
        }
        let updates = self.poller.drain();
        self.state.source_status = self.poller.status();
        self.state.poller_stats = self.poller.stats();
        self.state.delta_stats = self.poller.delta_stats();

        for update in updates? {
            match update {
                PollUpdate::Round(table) => self.state.apply_table(table, Local::now()),
                PollUpdate::Finished(last) => {
                    if let Some(table) = last {
                        self.state.apply_table(table, Local::now());
                    }
                    self.state.status_message = Some(format!(
                        "{} finished after {} rounds, press q to quit",
                        self.poller.describe(),
                        self.poller.rounds()
                    ));
                }
            }
        }
        Ok(())
    }
}
