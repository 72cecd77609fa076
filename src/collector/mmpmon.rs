//! `mmpmon` subprocess management.
//!
//! The process is started once with a repeat count and delay, receives its
//! requests on stdin, and then streams one response block per delay.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{CounterSource, SourceError, SourceEvent, SourceExit};

/// Default install location of the GPFS admin commands.
pub const DEFAULT_MMPMON: &str = "/usr/lpp/mmfs/bin/mmpmon";

/// Options prepended to run a command on a remote host.
pub const SSH_ARGS: [&str; 5] = ["ssh", "-o", "BatchMode=yes", "-o", "ConnectTimeout=4"];

/// True when `host` names this machine, so no ssh hop is needed.
pub fn is_local_host(host: &str) -> bool {
    matches!(
        host,
        "" | "localhost" | "localhost.localdomain" | "127.0.0.1" | "::1"
    )
}

/// Full argv to run `argv` on `host`, going through ssh when it is remote.
pub fn host_argv(host: &str, argv: Vec<String>) -> Vec<String> {
    if is_local_host(host) {
        return argv;
    }
    SSH_ARGS
        .iter()
        .map(|s| s.to_string())
        .chain(std::iter::once(host.to_string()))
        .chain(argv)
        .collect()
}

/// Builds a [`Command`] from a non-empty argv.
pub(crate) fn command_from_argv(argv: &[String]) -> Command {
    let mut cmd = Command::new(&argv[0]);
    cmd.args(&argv[1..]);
    cmd
}

/// How to invoke mmpmon.
#[derive(Debug, Clone, PartialEq)]
pub struct MmpmonCommand {
    pub program: PathBuf,
    pub host: String,
    /// Number of repetitions, 0 for unlimited.
    pub runs: u32,
    /// Delay between repetitions.
    pub delay: Duration,
}

impl MmpmonCommand {
    pub fn new(host: impl Into<String>, delay: Duration) -> Self {
        Self {
            program: PathBuf::from(DEFAULT_MMPMON),
            host: host.into(),
            runs: 0,
            delay,
        }
    }

    /// Complete argv, including the ssh prefix for remote hosts.
    pub fn argv(&self) -> Vec<String> {
        let delay_ms = self.delay.as_millis().max(1);
        host_argv(
            &self.host,
            vec![
                self.program.display().to_string(),
                "-p".to_string(),
                "-s".to_string(),
                "-r".to_string(),
                self.runs.to_string(),
                "-d".to_string(),
                delay_ms.to_string(),
            ],
        )
    }

    /// Request script written to mmpmon's stdin.
    ///
    /// Nodes are added one per `nlist add`; a single multi-node request is
    /// capped by mmpmon at 98 nodes.
    pub fn requests(nodes: &[String]) -> String {
        let mut script = String::new();
        for node in nodes {
            script.push_str("nlist add ");
            script.push_str(node);
            script.push('\n');
        }
        script.push_str("fs_io_s\n");
        script
    }
}

/// Live [`CounterSource`] backed by an mmpmon child process.
pub struct MmpmonSource {
    command: MmpmonCommand,
    child: Option<Child>,
    readers: Vec<JoinHandle<()>>,
}

impl MmpmonSource {
    pub fn new(command: MmpmonCommand) -> Self {
        Self {
            command,
            child: None,
            readers: Vec::new(),
        }
    }

    fn spawn_reader<R, F>(
        name: &str,
        stream: R,
        tx: Sender<SourceEvent>,
        wrap: F,
        close: bool,
    ) -> io::Result<JoinHandle<()>>
    where
        R: Read + Send + 'static,
        F: Fn(String) -> SourceEvent + Send + 'static,
    {
        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                forward_lines(stream, &tx, wrap);
                if close {
                    let _ = tx.send(SourceEvent::Closed);
                }
            })
    }
}

/// Moves lines from `stream` into `tx` until EOF, a read error, or a closed receiver.
fn forward_lines<R: Read, F: Fn(String) -> SourceEvent>(
    stream: R,
    tx: &Sender<SourceEvent>,
    wrap: F,
) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']).to_string();
                if tx.send(wrap(line)).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "read from mmpmon failed");
                break;
            }
        }
    }
}

impl CounterSource for MmpmonSource {
    fn start(&mut self, nodes: &[String], tx: Sender<SourceEvent>) -> Result<(), SourceError> {
        if self.child.is_some() {
            return Err(SourceError::AlreadyStarted);
        }
        let argv = self.command.argv();
        info!(argv = ?argv, nodes = nodes.len(), "starting mmpmon");

        let mut child = command_from_argv(&argv)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SourceError::Spawn {
                program: argv[0].clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdin = child.stdin.take();
        // Store before anything can fail so the child is always reaped.
        self.child = Some(child);

        if let Some(stdout) = stdout {
            let handle = Self::spawn_reader(
                "mmpmon-stdout",
                stdout,
                tx.clone(),
                SourceEvent::Line,
                true,
            )?;
            self.readers.push(handle);
        }
        if let Some(stderr) = stderr {
            let handle =
                Self::spawn_reader("mmpmon-stderr", stderr, tx, SourceEvent::Stderr, false)?;
            self.readers.push(handle);
        }

        if let Some(mut stdin) = stdin {
            let script = MmpmonCommand::requests(nodes);
            debug!(bytes = script.len(), "writing mmpmon requests");
            match stdin.write_all(script.as_bytes()).and_then(|_| stdin.flush()) {
                Ok(()) => {}
                // The process is already gone; its exit is reported via the stream.
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    warn!("mmpmon closed its input early");
                }
                Err(e) => {
                    self.terminate();
                    return Err(SourceError::Request(e));
                }
            }
            // Dropping stdin closes it, which starts the repetitions.
        }
        Ok(())
    }

    fn wait(&mut self) -> Result<SourceExit, SourceError> {
        let Some(mut child) = self.child.take() else {
            return Ok(SourceExit::ok());
        };
        let status = child.wait()?;
        for handle in self.readers.drain(..) {
            let _ = handle.join();
        }
        debug!(%status, "mmpmon exited");
        Ok(SourceExit {
            success: status.success(),
            status: status.to_string(),
        })
    }

    fn terminate(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        match child.try_wait() {
            Ok(Some(status)) => debug!(%status, "mmpmon already exited"),
            _ => {
                if let Err(e) = child.kill() {
                    warn!(error = %e, "failed to kill mmpmon");
                }
                match child.wait() {
                    Ok(status) => debug!(%status, "mmpmon terminated"),
                    Err(e) => warn!(error = %e, "failed to reap mmpmon"),
                }
            }
        }
        // Readers finish on their own once the pipes close.
        self.readers.clear();
    }

    fn describe(&self) -> String {
        format!("mmpmon@{}", self.command.host)
    }
}

impl Drop for MmpmonSource {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_local_argv() {
        let mut cmd = MmpmonCommand::new("localhost", Duration::from_secs(3));
        cmd.runs = 5;
        assert_eq!(
            cmd.argv(),
            ["/usr/lpp/mmfs/bin/mmpmon", "-p", "-s", "-r", "5", "-d", "3000"]
        );
    }

    #[test]
    fn test_remote_argv_goes_through_ssh() {
        let cmd = MmpmonCommand::new("gpfs-mgr1", Duration::from_millis(1500));
        let argv = cmd.argv();
        assert_eq!(
            &argv[..6],
            ["ssh", "-o", "BatchMode=yes", "-o", "ConnectTimeout=4", "gpfs-mgr1"]
        );
        assert_eq!(argv.last().map(String::as_str), Some("1500"));
    }

    #[test]
    fn test_local_host_names() {
        assert!(is_local_host("localhost"));
        assert!(is_local_host("127.0.0.1"));
        assert!(!is_local_host("node01"));
    }

    #[test]
    fn test_requests_one_node_per_nlist() {
        let nodes = vec!["n1".to_string(), "n2".to_string()];
        assert_eq!(
            MmpmonCommand::requests(&nodes),
            "nlist add n1\nnlist add n2\nfs_io_s\n"
        );
        assert_eq!(MmpmonCommand::requests(&[]), "fs_io_s\n");
    }

    #[test]
    fn test_spawn_failure() {
        let mut cmd = MmpmonCommand::new("localhost", Duration::from_secs(1));
        cmd.program = PathBuf::from("/nonexistent/gcam-test/mmpmon");
        let mut source = MmpmonSource::new(cmd);
        let (tx, _rx) = mpsc::channel();
        let err = source.start(&[], tx).unwrap_err();
        assert!(matches!(err, SourceError::Spawn { .. }), "{err}");
    }

    #[cfg(unix)]
    #[test]
    fn test_streams_stdout_then_closes() {
        // echo prints its arguments and ignores the request script.
        let mut cmd = MmpmonCommand::new("localhost", Duration::from_secs(2));
        cmd.program = PathBuf::from("echo");
        let mut source = MmpmonSource::new(cmd);
        let (tx, rx) = mpsc::channel();
        source.start(&["n1".to_string()], tx).unwrap();

        let mut events = Vec::new();
        while let Ok(ev) = rx.recv_timeout(Duration::from_secs(5)) {
            let closed = ev == SourceEvent::Closed;
            events.push(ev);
            if closed {
                break;
            }
        }
        assert_eq!(
            events,
            [
                SourceEvent::Line("-p -s -r 0 -d 2000".to_string()),
                SourceEvent::Closed
            ]
        );
        assert!(source.wait().unwrap().success);
        source.terminate();
    }
}
