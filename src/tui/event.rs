//! Terminal input thread.
//!
//! Crossterm events and idle ticks are funnelled into one channel so the app
//! loop can also drain the counter source between keystrokes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};

/// Application events.
#[derive(Debug)]
pub enum Event {
    /// Nothing arrived within a tick: drain the poller, refresh the clock.
    Tick,
    Key(KeyEvent),
    /// New terminal size (width, height).
    Resize(u16, u16),
}

fn translate(evt: CrosstermEvent) -> Option<Event> {
    match evt {
        // Windows reports releases too.
        CrosstermEvent::Key(key) if key.kind != KeyEventKind::Release => Some(Event::Key(key)),
        CrosstermEvent::Resize(w, h) => Some(Event::Resize(w, h)),
        _ => None,
    }
}

fn pump_terminal(tick_rate: Duration, tx: Sender<Event>, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::Relaxed) {
        let event = match event::poll(tick_rate) {
            Ok(true) => match event::read().ok().and_then(translate) {
                Some(event) => event,
                None => continue,
            },
            // No terminal to read from behaves like an idle terminal.
            Ok(false) | Err(_) => Event::Tick,
        };
        if tx.send(event).is_err() {
            break;
        }
    }
}

/// Owns the input thread; stops it on drop.
pub struct EventHandler {
    rx: Receiver<Event>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name("gcam-input".to_string())
            .spawn(move || pump_terminal(tick_rate, tx, thread_stop))
            .ok();
        Self { rx, stop, thread }
    }

    /// Blocks until the next event. Fails once the input thread is gone.
    pub fn next(&self) -> Result<Event, mpsc::RecvError> {
        self.rx.recv()
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
