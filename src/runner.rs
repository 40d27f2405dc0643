//! External process execution
//!
//! All external tools go through a `ProcessRunner`. `SystemRunner` is the real
//! implementation:
//!
//! - children run in their own process group (see `process_guard`)
//! - every live child PID is held in the shared `ChildRegistry`
//! - stdin is closed; tools must run non-interactively
//!
//! Two contracts are offered. `execute` trusts the exit status.
//! `execute_watching` ignores the exit status and instead scans stdout and
//! stderr for a success or failure marker; the first marker seen on either
//! stream decides the outcome. A process that exits without printing a
//! marker yields `NoMarker`, one that stays silent past the timeout is
//! killed and yields `TimedOut`.

use crate::process_guard::{terminate_group, CommandProcessGroup, SharedRegistry};
use crate::tool_traits::Invocation;
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failure to start or supervise a process (as opposed to a clean non-zero exit)
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed waiting for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Output of `{program}` could not be captured")]
    Capture { program: String },
}

/// Markers searched for in a watched process's output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    pub success: String,
    pub failure: String,
}

/// Outcome of a marker-watched process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Success marker appeared first
    Success,
    /// Failure marker appeared first
    Failure,
    /// Both streams closed without either marker
    NoMarker,
    /// No marker before the deadline; the process was killed
    TimedOut,
}

impl WatchOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Runs external tools on behalf of the pipeline
pub trait ProcessRunner {
    /// Run to completion with inherited output. `Ok(false)` is a non-zero exit.
    fn execute(&self, invocation: &Invocation) -> Result<bool, RunnerError>;

    /// Run with captured output and resolve on the first marker line.
    fn execute_watching(
        &self,
        invocation: &Invocation,
        markers: &Markers,
        timeout: Duration,
    ) -> Result<WatchOutcome, RunnerError>;
}

/// Process runner backed by `std::process`
#[derive(Debug, Clone)]
pub struct SystemRunner {
    registry: SharedRegistry,
    grace_period: Duration,
}

impl SystemRunner {
    pub fn new(registry: SharedRegistry) -> Self {
        Self {
            registry,
            grace_period: Duration::from_secs(3),
        }
    }

    fn command(invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .in_new_process_group();
        cmd
    }

    fn spawn(&self, cmd: &mut Command, invocation: &Invocation) -> Result<Child, RunnerError> {
        let child = cmd.spawn().map_err(|source| RunnerError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;
        self.with_registry(|r| r.register(child.id()));
        Ok(child)
    }

    fn with_registry(&self, f: impl FnOnce(&mut crate::process_guard::ChildRegistry)) {
        match self.registry.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    /// Wait for exit, killing the process group once `deadline` passes.
    fn reap(
        &self,
        child: &mut Child,
        deadline: Instant,
        invocation: &Invocation,
    ) -> Result<(), RunnerError> {
        let pid = child.id();
        let wait_err = |source: std::io::Error| RunnerError::Wait {
            program: invocation.program.clone(),
            source,
        };

        loop {
            match child.try_wait().map_err(wait_err)? {
                Some(status) => {
                    debug!("`{}` exited with {}", invocation, status);
                    break;
                }
                None if Instant::now() >= deadline => {
                    warn!("`{}` still running at deadline, terminating", invocation);
                    terminate_group(pid, self.grace_period);
                    child.wait().map_err(wait_err)?;
                    break;
                }
                None => thread::sleep(Duration::from_millis(25)),
            }
        }

        self.with_registry(|r| r.unregister(pid));
        Ok(())
    }
}

impl ProcessRunner for SystemRunner {
    fn execute(&self, invocation: &Invocation) -> Result<bool, RunnerError> {
        info!("Running `{}`", invocation);

        let mut cmd = Self::command(invocation);
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        let mut child = self.spawn(&mut cmd, invocation)?;
        let pid = child.id();

        let status = child.wait().map_err(|source| RunnerError::Wait {
            program: invocation.program.clone(),
            source,
        });
        self.with_registry(|r| r.unregister(pid));
        let status = status?;

        info!("`{}` finished with {}", invocation, status);
        Ok(status.success())
    }

    fn execute_watching(
        &self,
        invocation: &Invocation,
        markers: &Markers,
        timeout: Duration,
    ) -> Result<WatchOutcome, RunnerError> {
        info!(
            "Running `{}` (success={:?}, failure={:?}, timeout={:?})",
            invocation, markers.success, markers.failure, timeout
        );

        let mut cmd = Self::command(invocation);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        let mut child = self.spawn(&mut cmd, invocation)?;
        let deadline = Instant::now() + timeout;

        let capture_err = || RunnerError::Capture {
            program: invocation.program.clone(),
        };
        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(out), Some(err)) => (out, err),
            _ => {
                terminate_group(child.id(), self.grace_period);
                self.reap(&mut child, Instant::now(), invocation)?;
                return Err(capture_err());
            }
        };

        let (tx, rx) = mpsc::channel();
        spawn_reader(stdout, Stream::Stdout, markers.clone(), tx.clone());
        spawn_reader(stderr, Stream::Stderr, markers.clone(), tx);

        let mut closed = 0;
        let outcome = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(ReaderEvent::Marker(true)) => break WatchOutcome::Success,
                Ok(ReaderEvent::Marker(false)) => break WatchOutcome::Failure,
                Ok(ReaderEvent::Closed) => {
                    closed += 1;
                    if closed == 2 {
                        break WatchOutcome::NoMarker;
                    }
                }
                Err(RecvTimeoutError::Timeout) => break WatchOutcome::TimedOut,
                Err(RecvTimeoutError::Disconnected) => break WatchOutcome::NoMarker,
            }
        };

        // The whole group goes on timeout, even if the leader already exited:
        // a background descendant can still hold the pipes open.
        let reap_deadline = if outcome == WatchOutcome::TimedOut {
            warn!("`{}` produced no marker in time, terminating its group", invocation);
            terminate_group(child.id(), self.grace_period);
            Instant::now() + self.grace_period
        } else {
            deadline
        };
        self.reap(&mut child, reap_deadline, invocation)?;

        info!("`{}` resolved as {:?}", invocation, outcome);
        Ok(outcome)
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug)]
enum ReaderEvent {
    /// `true` for the success marker, `false` for the failure marker
    Marker(bool),
    Closed,
}

/// Echo the stream to the operator and report its first marker line.
fn spawn_reader<R: Read + Send + 'static>(
    source: R,
    stream: Stream,
    markers: Markers,
    tx: Sender<ReaderEvent>,
) {
    thread::spawn(move || {
        let mut reported = false;
        for line in BufReader::new(source).lines().map_while(Result::ok) {
            match stream {
                Stream::Stdout => println!("{}", line),
                Stream::Stderr => eprintln!("{}", line),
            }
            if reported || line.trim().is_empty() {
                continue;
            }

            let hit = if line.contains(&markers.success) {
                Some(true)
            } else if line.contains(&markers.failure) {
                Some(false)
            } else {
                None
            };
            if let Some(success) = hit {
                debug!("{:?} marker line: {}", stream, line);
                reported = true;
                // Receiver may already have resolved from the other stream
                let _ = tx.send(ReaderEvent::Marker(success));
            }
        }
        let _ = tx.send(ReaderEvent::Closed);
    });
}
