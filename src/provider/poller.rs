//! Poller: drives a [`CounterSource`] and turns its output into tables.

use std::collections::{HashSet, VecDeque};
use std::mem::{Discriminant, discriminant};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::collector::{
    CounterSource, DAEMON_UNAVAILABLE, ParseError, SourceError, SourceEvent, parse_line,
};
use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::rates::DeltaStats;
use crate::round::RoundAssembler;
use crate::table::IoTable;

/// Stderr lines kept for error messages.
const STDERR_TAIL: usize = 5;

/// Something the display should react to.
#[derive(Debug, Clone, PartialEq)]
pub enum PollUpdate {
    /// A round closed and was turned into a table.
    Round(IoTable),
    /// The source ended as requested; carries the flushed last round.
    Finished(Option<IoTable>),
}

/// Coarse state for the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerStatus {
    /// Started, no complete round yet.
    Collecting,
    Live,
    Stalled,
    Finished,
}

/// Counters of lines that did not become rate data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollerStats {
    pub lines: u64,
    pub control: u64,
    pub malformed: u64,
    pub stderr_lines: u64,
    pub stalls: u64,
}

/// Stall detection settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StallPolicy {
    /// Silence after which the source counts as stalled.
    pub timeout: Duration,
    /// Consecutive stalled windows before giving up.
    pub limit: u32,
}

impl StallPolicy {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            timeout: config.stall_timeout(),
            limit: config.stall_limit,
        }
    }
}

/// Owns the counter source and the round pipeline.
pub struct Poller {
    source: Box<dyn CounterSource>,
    rx: Option<Receiver<SourceEvent>>,
    assembler: RoundAssembler,
    host: String,
    /// mmpmon was asked for a finite number of runs, so end of stream is normal.
    finite: bool,
    stall: StallPolicy,
    last_activity: Instant,
    stall_windows: u32,
    saw_first_line: bool,
    finished: bool,
    status: PollerStatus,
    stats: PollerStats,
    warned: HashSet<Discriminant<ParseError>>,
    stderr_tail: VecDeque<String>,
}

impl Poller {
    pub fn new(source: Box<dyn CounterSource>, config: &MonitorConfig) -> Self {
        Self::with_policy(
            source,
            &config.host,
            config.runs > 0,
            StallPolicy::from_config(config),
        )
    }

    pub fn with_policy(
        source: Box<dyn CounterSource>,
        host: &str,
        finite: bool,
        stall: StallPolicy,
    ) -> Self {
        Self {
            source,
            rx: None,
            assembler: RoundAssembler::new(),
            host: host.to_string(),
            finite,
            stall,
            last_activity: Instant::now(),
            stall_windows: 0,
            saw_first_line: false,
            finished: false,
            status: PollerStatus::Collecting,
            stats: PollerStats::default(),
            warned: HashSet::new(),
            stderr_tail: VecDeque::with_capacity(STDERR_TAIL),
        }
    }

    /// Starts the source for `nodes`.
    pub fn start(&mut self, nodes: &[String]) -> Result<(), MonitorError> {
        let (tx, rx) = mpsc::channel();
        self.source.start(nodes, tx)?;
        info!(source = %self.source.describe(), nodes = nodes.len(), "polling started");
        self.rx = Some(rx);
        self.last_activity = Instant::now();
        Ok(())
    }

    pub fn status(&self) -> PollerStatus {
        self.status
    }

    pub fn is_stalled(&self) -> bool {
        self.status == PollerStatus::Stalled
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn stats(&self) -> PollerStats {
        self.stats
    }

    pub fn delta_stats(&self) -> DeltaStats {
        self.assembler.engine().stats()
    }

    pub fn rounds(&self) -> u64 {
        self.assembler.closed_rounds()
    }

    pub fn describe(&self) -> String {
        self.source.describe()
    }

    /// Waits up to `timeout` for one event and processes it.
    pub fn poll(&mut self, timeout: Duration) -> Result<Option<PollUpdate>, MonitorError> {
        if self.finished {
            return Ok(None);
        }
        let received = match &self.rx {
            Some(rx) => rx.recv_timeout(timeout),
            None => Err(RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(event) => self.handle(event, Instant::now()),
            Err(RecvTimeoutError::Timeout) => {
                self.check_stall(Instant::now())?;
                Ok(None)
            }
            Err(RecvTimeoutError::Disconnected) => self.handle(SourceEvent::Closed, Instant::now()),
        }
    }

    /// Processes every event already queued, then checks for a stall.
    pub fn drain(&mut self) -> Result<Vec<PollUpdate>, MonitorError> {
        let mut updates = Vec::new();
        while !self.finished {
            let received = match &self.rx {
                Some(rx) => rx.try_recv(),
                None => Err(TryRecvError::Disconnected),
            };
            let event = match received {
                Ok(event) => event,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => SourceEvent::Closed,
            };
            updates.extend(self.handle(event, Instant::now())?);
        }
        if !self.finished {
            self.check_stall(Instant::now())?;
        }
        Ok(updates)
    }

    /// Processes one source event.
    pub fn handle(
        &mut self,
        event: SourceEvent,
        now: Instant,
    ) -> Result<Option<PollUpdate>, MonitorError> {
        match event {
            SourceEvent::Line(line) => self.handle_line(&line, now),
            SourceEvent::Stderr(line) => {
                self.stats.stderr_lines += 1;
                warn!(line = %line, "mmpmon stderr");
                if self.stderr_tail.len() == STDERR_TAIL {
                    self.stderr_tail.pop_front();
                }
                self.stderr_tail.push_back(line);
                Ok(None)
            }
            SourceEvent::Closed => self.handle_closed(),
        }
    }

    fn handle_line(
        &mut self,
        line: &str,
        now: Instant,
    ) -> Result<Option<PollUpdate>, MonitorError> {
        self.stats.lines += 1;
        self.last_activity = now;
        if self.stall_windows > 0 || self.status == PollerStatus::Stalled {
            info!(windows = self.stall_windows, "data flowing again");
            self.stall_windows = 0;
            self.status = if self.rounds() > 0 {
                PollerStatus::Live
            } else {
                PollerStatus::Collecting
            };
        }

        if !self.saw_first_line {
            self.saw_first_line = true;
            if line.trim() == DAEMON_UNAVAILABLE {
                self.source.terminate();
                self.finished = true;
                return Err(SourceError::DaemonUnavailable {
                    host: self.host.clone(),
                }
                .into());
            }
        }

        match parse_line(line) {
            Ok(sample) => Ok(self.assembler.push(sample).map(|round| {
                self.status = PollerStatus::Live;
                let table = IoTable::build(&round);
                debug!(round = table.round, rows = table.rows.len(), "round closed");
                PollUpdate::Round(table)
            })),
            Err(e) if e.is_control() => {
                self.stats.control += 1;
                trace!(line, reason = %e, "control record");
                Ok(None)
            }
            Err(e) => {
                self.stats.malformed += 1;
                if self.warned.insert(discriminant(&e)) {
                    warn!(line, reason = %e, "skipping malformed line, repeats logged at debug");
                } else {
                    debug!(line, reason = %e, "skipping malformed line");
                }
                Ok(None)
            }
        }
    }

    fn handle_closed(&mut self) -> Result<Option<PollUpdate>, MonitorError> {
        if self.finished {
            return Ok(None);
        }
        self.finished = true;
        self.status = PollerStatus::Finished;
        let last = self.assembler.finish().map(|round| IoTable::build(&round));
        let exit = self.source.wait()?;
        info!(status = %exit.status, rounds = self.rounds(), "source stream closed");

        if exit.success && self.finite {
            return Ok(Some(PollUpdate::Finished(last)));
        }
        let mut status = exit.status;
        if !self.stderr_tail.is_empty() {
            let tail: Vec<&str> = self.stderr_tail.iter().map(String::as_str).collect();
            status = format!("{status}: {}", tail.join(" | "));
        }
        Err(SourceError::Exited { status }.into())
    }

    /// Updates stall tracking. Fails once the stall limit is reached.
    pub fn check_stall(&mut self, now: Instant) -> Result<(), MonitorError> {
        if self.finished {
            return Ok(());
        }
        let silent = now.saturating_duration_since(self.last_activity);
        if silent < self.stall.timeout {
            return Ok(());
        }
        self.stall_windows += 1;
        self.stats.stalls += 1;
        self.last_activity = now;
        self.status = PollerStatus::Stalled;
        warn!(
            source = %self.source.describe(),
            silent_secs = silent.as_secs_f64(),
            windows = self.stall_windows,
            limit = self.stall.limit,
            "no data from counter source"
        );
        if self.stall_windows >= self.stall.limit {
            return Err(MonitorError::Stalled {
                source_name: self.source.describe(),
                waited: self
                    .stall
                    .timeout
                    .saturating_mul(self.stall_windows)
                    .as_secs_f64(),
                windows: self.stall_windows,
            });
        }
        Ok(())
    }

    /// Stops the source. Safe to call more than once.
    pub fn shutdown(&mut self) {
        debug!(source = %self.source.describe(), "shutting down source");
        self.source.terminate();
        self.rx = None;
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.source.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::ScriptedSource;
    use crate::collector::parser::format_fs_io_line;

    fn policy() -> StallPolicy {
        StallPolicy {
            timeout: Duration::from_secs(15),
            limit: 2,
        }
    }

    fn poller(source: ScriptedSource, finite: bool) -> Poller {
        Poller::with_policy(Box::new(source), "localhost", finite, policy())
    }

    fn line(node: &str, secs: u64, br: u64, bw: u64) -> SourceEvent {
        SourceEvent::Line(format_fs_io_line(node, "fs1", secs, 0, br, bw))
    }

    #[test]
    fn test_rounds_from_scripted_source() {
        let lines = vec![
            format_fs_io_line("n1", "fs1", 0, 0, 0, 0),
            format_fs_io_line("n2", "fs1", 0, 0, 0, 0),
            format_fs_io_line("n1", "fs1", 1, 0, 1000, 0),
            format_fs_io_line("n2", "fs1", 1, 0, 0, 2000),
        ];
        let mut p = poller(ScriptedSource::from_lines(lines), true);
        p.start(&[]).unwrap();

        let mut updates = Vec::new();
        while !p.is_finished() {
            updates.extend(p.poll(Duration::from_millis(100)).unwrap());
        }
        assert_eq!(updates.len(), 2);
        let PollUpdate::Round(first) = &updates[0] else {
            panic!("expected round, got {:?}", updates[0]);
        };
        assert!(first.is_baseline_only());
        let PollUpdate::Finished(Some(last)) = &updates[1] else {
            panic!("expected finished, got {:?}", updates[1]);
        };
        assert_eq!(last.row("n1", "fs1").unwrap().read_rate, Some(1000.0));
        assert_eq!(last.row("n2", "fs1").unwrap().write_rate, Some(2000.0));
        assert_eq!(p.status(), PollerStatus::Finished);
    }

    #[test]
    fn test_daemon_unavailable_first_line() {
        let mut p = poller(ScriptedSource::from_lines([DAEMON_UNAVAILABLE]), false);
        p.start(&[]).unwrap();
        let err = p.poll(Duration::from_millis(100)).unwrap_err();
        assert!(matches!(
            err,
            MonitorError::Source(SourceError::DaemonUnavailable { .. })
        ));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_unexpected_end_of_stream_is_error() {
        let source =
            ScriptedSource::from_lines(Vec::<String>::new()).with_exit(false, "exit status: 255");
        let mut p = poller(source, false);
        p.start(&[]).unwrap();
        let stderr = SourceEvent::Stderr("ssh: connect to host x: refused".into());
        p.handle(stderr, Instant::now()).unwrap();
        let err = p.handle(SourceEvent::Closed, Instant::now()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("255"), "{msg}");
        assert!(msg.contains("refused"), "{msg}");
    }

    #[test]
    fn test_clean_exit_with_unlimited_runs_is_still_error() {
        let mut p = poller(ScriptedSource::from_lines(Vec::<String>::new()), false);
        p.start(&[]).unwrap();
        assert!(p.handle(SourceEvent::Closed, Instant::now()).is_err());
    }

    #[test]
    fn test_malformed_and_control_lines_counted() {
        let mut p = poller(ScriptedSource::default(), false);
        let now = Instant::now();
        let nlist = "_nlist_ _n_ 1.2.3.4 _nn_ n1 _req_ add _rc_ 0";
        p.handle(SourceEvent::Line(nlist.into()), now).unwrap();
        p.handle(SourceEvent::Line("garbage".into()), now).unwrap();
        p.handle(SourceEvent::Line("more garbage".into()), now).unwrap();
        p.handle(line("n1", 0, 0, 0), now).unwrap();
        let stats = p.stats();
        assert_eq!(stats.control, 1);
        assert_eq!(stats.malformed, 2);
        assert_eq!(stats.lines, 4);
        assert_eq!(p.status(), PollerStatus::Collecting);
    }

    #[test]
    fn test_stall_then_recover_then_give_up() {
        let mut p = poller(ScriptedSource::default(), false);
        let t0 = Instant::now();
        p.handle(line("n1", 0, 0, 0), t0).unwrap();

        p.check_stall(t0 + Duration::from_secs(5)).unwrap();
        assert!(!p.is_stalled());

        p.check_stall(t0 + Duration::from_secs(16)).unwrap();
        assert!(p.is_stalled());

        // Data resumes and resets the window count.
        p.handle(line("n2", 20, 0, 0), t0 + Duration::from_secs(20)).unwrap();
        assert!(!p.is_stalled());

        p.check_stall(t0 + Duration::from_secs(36)).unwrap();
        let err = p.check_stall(t0 + Duration::from_secs(52)).unwrap_err();
        assert!(matches!(err, MonitorError::Stalled { windows: 2, .. }));
        assert_eq!(p.stats().stalls, 3);
    }
}
