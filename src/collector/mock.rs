//! Scripted counter source for tests and demos.
//!
//! Replays a fixed list of events without spawning anything, so the whole
//! pipeline can be exercised on any platform.

use std::sync::mpsc::Sender;

use super::{CounterSource, SourceError, SourceEvent, SourceExit};

/// A [`CounterSource`] that sends pre-recorded events.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    events: Vec<SourceEvent>,
    exit: Option<SourceExit>,
    /// Keeps the channel open after the script so the receiver sees silence
    /// instead of a disconnect.
    hold_open: bool,
    held: Option<Sender<SourceEvent>>,
    started: bool,
    terminated: bool,
}

impl ScriptedSource {
    /// Source that emits `lines` and then closes with a clean exit.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut events: Vec<SourceEvent> = lines
            .into_iter()
            .map(|l| SourceEvent::Line(l.into()))
            .collect();
        events.push(SourceEvent::Closed);
        Self {
            events,
            exit: Some(SourceExit::ok()),
            ..Self::default()
        }
    }

    /// Source that emits exactly `events` and never closes on its own.
    pub fn from_events(events: Vec<SourceEvent>) -> Self {
        Self {
            events,
            hold_open: true,
            ..Self::default()
        }
    }

    /// Sets the status reported by [`CounterSource::wait`].
    pub fn with_exit(mut self, success: bool, status: &str) -> Self {
        self.exit = Some(SourceExit {
            success,
            status: status.to_string(),
        });
        self
    }

    pub fn was_terminated(&self) -> bool {
        self.terminated
    }
}

impl CounterSource for ScriptedSource {
    fn start(&mut self, _nodes: &[String], tx: Sender<SourceEvent>) -> Result<(), SourceError> {
        if self.started {
            return Err(SourceError::AlreadyStarted);
        }
        self.started = true;
        for event in self.events.drain(..) {
            if tx.send(event).is_err() {
                break;
            }
        }
        if self.hold_open {
            self.held = Some(tx);
        }
        Ok(())
    }

    fn wait(&mut self) -> Result<SourceExit, SourceError> {
        Ok(self.exit.clone().unwrap_or_else(SourceExit::ok))
    }

    fn terminate(&mut self) {
        self.held = None;
        self.terminated = true;
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}
