//! Supervised source sessions.
//!
//! A [`SourceSession`] owns one child process, the bounded buffer of its
//! output, and the subscriber fan-out. The supervisor task is the only
//! writer of session state and (through the reader loop) of the buffer;
//! everything else observes through the hub.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tailview_core::{BufferConfig, SourceDescriptor};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::hub::{BroadcastHub, SessionEvent};
use crate::shutdown::shutdown_child;

/// First retry delay after a crash.
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
/// Retry delay ceiling; bounds crash-loop CPU.
const MAX_BACKOFF: Duration = Duration::from_secs(60);
/// A run at least this long counts as healthy and resets the backoff.
const BACKOFF_RESET_UPTIME: Duration = Duration::from_secs(30);

/// Lifecycle of a source session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No backing process yet.
    Idle,
    /// Launch in progress.
    Starting,
    /// Process up, reader attached.
    Running,
    /// Process exited or failed to launch; relaunch pending.
    Crashed,
    /// Shut down for good.
    Stopped,
}

enum RunOutcome {
    /// Shutdown requested; the child has been terminated.
    Cancelled,
    /// The process exited (or its stdout closed) on its own.
    Exited(Option<std::process::ExitStatus>),
}

/// One supervised source: child process, buffer, subscribers.
pub struct SourceSession {
    descriptor: SourceDescriptor,
    hub: BroadcastHub,
    state: Mutex<SessionState>,
    started: AtomicBool,
    supervisor: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for SourceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceSession")
            .field("descriptor", &self.descriptor)
            .field("state", &self.state())
            .field("started", &self.started.load(std::sync::atomic::Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl SourceSession {
    pub fn new(descriptor: SourceDescriptor, buffer: BufferConfig) -> Arc<Self> {
        Arc::new(Self {
            descriptor,
            hub: BroadcastHub::new(buffer),
            state: Mutex::new(SessionState::Idle),
            started: AtomicBool::new(false),
            supervisor: Mutex::new(None),
            cancel: CancellationToken::new(),
        })
    }

    pub fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, next: SessionState) {
        let mut state = self.state.lock().unwrap();
        // Stopped is terminal.
        if *state != SessionState::Stopped {
            *state = next;
        }
    }

    /// Subscribe to this session.
    ///
    /// Returns the buffered backlog at the moment of subscription and a
    /// receiver for every event published afterwards; the handoff is
    /// atomic with respect to the reader (no gap, no duplicate). The
    /// registry has already started the supervisor by the time a
    /// subscriber gets here.
    pub fn subscribe(&self) -> (Vec<String>, broadcast::Receiver<SessionEvent>) {
        self.hub.subscribe()
    }

    /// The most recent `count` buffered lines. Does not start the
    /// process.
    pub fn recent(&self, count: usize) -> Vec<String> {
        self.hub.recent(count)
    }

    pub fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }

    /// Spawn the supervisor task once. Later calls are no-ops.
    pub fn ensure_started(self: Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let session = Arc::clone(&self);
        let handle = tokio::spawn(async move { session.supervise().await });
        *self.supervisor.lock().unwrap() = Some(handle);
    }

    /// Terminate the child, notify subscribers, and wait for the
    /// supervisor to finish. Idempotent.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.supervisor.lock().unwrap().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(source = %self.descriptor.id, error = %e, "supervisor task failed");
            }
        } else {
            // Never started: nothing to terminate, but the state still
            // has to reflect the shutdown.
            self.set_state(SessionState::Stopped);
        }
    }

    /// Supervision loop: launch, read until exit, notify, back off,
    /// relaunch. The buffer survives relaunches, so a subscriber that
    /// stays attached across a crash sees the stream resume without
    /// losing the retained lines.
    async fn supervise(self: Arc<Self>) {
        let mut backoff = INITIAL_BACKOFF;
        while !self.cancel.is_cancelled() {
            self.set_state(SessionState::Starting);
            info!(
                source = %self.descriptor.id,
                command = %self.descriptor.command,
                working_dir = %self.descriptor.working_dir,
                "starting source process"
            );

            let launched_at = tokio::time::Instant::now();
            match self.spawn_child() {
                Ok(child) => {
                    self.set_state(SessionState::Running);
                    match self.run_child(child).await {
                        RunOutcome::Cancelled => break,
                        RunOutcome::Exited(status) => {
                            warn!(
                                source = %self.descriptor.id,
                                status = ?status,
                                "source process exited unexpectedly"
                            );
                            self.set_state(SessionState::Crashed);
                            self.hub.notify_error(format!(
                                "log process for '{}' exited unexpectedly",
                                self.descriptor.id
                            ));
                        }
                    }
                }
                Err(e) => {
                    warn!(source = %self.descriptor.id, error = %e, "failed to launch source process");
                    self.set_state(SessionState::Crashed);
                    self.hub
                        .notify_error(format!("cannot start log process: {e}"));
                }
            }

            if launched_at.elapsed() >= BACKOFF_RESET_UPTIME {
                backoff = INITIAL_BACKOFF;
            }
            debug!(
                source = %self.descriptor.id,
                backoff_secs = backoff.as_secs(),
                "relaunching after backoff"
            );
            tokio::select! {
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(backoff) => {}
            }
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }

        self.set_state(SessionState::Stopped);
        self.hub.notify_closed();
        debug!(source = %self.descriptor.id, "supervisor exiting");
    }

    /// Launch the configured command. The command string is split on
    /// whitespace into program and arguments; no shell is involved.
    fn spawn_child(&self) -> std::io::Result<Child> {
        let mut parts = self.descriptor.command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"))?;

        let mut cmd = Command::new(program);
        cmd.args(parts)
            .current_dir(&self.descriptor.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd.spawn()
    }

    /// Read the child's output until it exits or shutdown is requested.
    async fn run_child(&self, mut child: Child) -> RunOutcome {
        let stdout = child.stdout.take();
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_stderr(stderr, self.descriptor.id.clone()));
        }

        tokio::select! {
            () = self.cancel.cancelled() => {
                debug!(source = %self.descriptor.id, "terminating source process");
                if let Err(e) = shutdown_child(child).await {
                    warn!(source = %self.descriptor.id, error = %e, "failed to terminate source process");
                }
                RunOutcome::Cancelled
            }
            () = self.read_stdout(stdout) => {
                // Reader hit EOF; reap the child.
                match child.wait().await {
                    Ok(status) => RunOutcome::Exited(Some(status)),
                    Err(e) => {
                        warn!(source = %self.descriptor.id, error = %e, "failed to reap source process");
                        RunOutcome::Exited(None)
                    }
                }
            }
        }
    }

    /// The session's single buffer writer: reads stdout line by line and
    /// publishes through the hub. Byte-based reading with lossy UTF-8 so
    /// a stray invalid byte does not kill the stream.
    async fn read_stdout(&self, stdout: Option<ChildStdout>) {
        let Some(stdout) = stdout else { return };
        let mut reader = BufReader::new(stdout);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    trim_line_ending(&mut buf);
                    if buf.is_empty() {
                        continue;
                    }
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    self.hub.publish(line);
                }
                Err(e) => {
                    debug!(source = %self.descriptor.id, error = %e, "stdout reader exiting on read error");
                    break;
                }
            }
        }
    }
}

fn trim_line_ending(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
}

/// stderr is not part of the stream; drain it into the server log.
async fn drain_stderr(stderr: ChildStderr, source_id: String) {
    let mut reader = BufReader::new(stderr);
    let mut buf: Vec<u8> = Vec::with_capacity(1024);
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                trim_line_ending(&mut buf);
                if !buf.is_empty() {
                    debug!(source = %source_id, "stderr: {}", String::from_utf8_lossy(&buf));
                }
            }
        }
    }
}
