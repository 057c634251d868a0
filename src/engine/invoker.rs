//! Process invoker - one request/response exchange with an external process
//!
//! stdin is fed and stdout/stderr drained on helper threads so a chatty
//! child can never deadlock against us. The main thread polls for exit and
//! then for the drained streams, both against the same deadline and the
//! cancel flag. A grandchild still holding a pipe cannot stretch an
//! invocation past its timeout.

use super::ExternalCommand;
use crate::error::InvocationError;
use std::io::{ErrorKind, Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default wall-clock bound for one invocation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(600_000);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Shared run-level cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Invocation seam; the orchestrator only ever talks to this trait.
pub trait Invoke: Send + Sync {
    fn invoke(
        &self,
        command: &ExternalCommand,
        request_body: &str,
        timeout: Duration,
    ) -> Result<Vec<u8>, InvocationError>;
}

/// Spawns real child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker {
    cancel: CancelToken,
}

impl ProcessInvoker {
    pub fn new(cancel: CancelToken) -> Self {
        Self { cancel }
    }
}

impl Invoke for ProcessInvoker {
    fn invoke(
        &self,
        command: &ExternalCommand,
        request_body: &str,
        timeout: Duration,
    ) -> Result<Vec<u8>, InvocationError> {
        let command_line = command.to_command_line();
        if self.cancel.is_cancelled() {
            return Err(InvocationError::Cancelled { command_line });
        }
        debug!("Spawning `{}`", command_line);

        let mut child = Command::new(&command.executable)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| InvocationError::SpawnFailed {
                command_line: command_line.clone(),
                source,
            })?;

        let stdin = child.stdin.take();
        let body = request_body.as_bytes().to_vec();
        let _writer = thread::spawn(move || {
            if let Some(mut stdin) = stdin {
                if let Err(e) = stdin.write_all(&body) {
                    // child may legitimately exit without reading its input
                    if e.kind() != ErrorKind::BrokenPipe {
                        warn!("Failed to write request: {}", e);
                    }
                }
                // dropping stdin closes it: end of input
            }
        });
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(source) => {
                    terminate(&mut child);
                    return Err(InvocationError::Io { command_line, source });
                }
            }
            if self.cancel.is_cancelled() {
                terminate(&mut child);
                return Err(InvocationError::Cancelled { command_line });
            }
            if Instant::now() >= deadline {
                terminate(&mut child);
                return Err(InvocationError::Timeout { command_line, timeout });
            }
            thread::sleep(POLL_INTERVAL);
        };
        debug!("`{}` exited with {}", command_line, status);

        let out = self.receive(&stdout, deadline);
        let err = self.receive(&stderr, deadline);
        let (out, err) = match (out, err) {
            (Ok(out), Ok(err)) => (out, err),
            (Err(Stalled::Cancelled), _) | (_, Err(Stalled::Cancelled)) => {
                return Err(InvocationError::Cancelled { command_line })
            }
            _ => {
                warn!("`{}` exited but its output streams stayed open", command_line);
                return Err(InvocationError::Timeout { command_line, timeout });
            }
        };
        let err_text = String::from_utf8_lossy(&err);
        if !err_text.trim().is_empty() {
            return Err(InvocationError::ToolReportedError {
                command_line,
                stderr: err_text.trim_end().to_string(),
            });
        }
        Ok(out)
    }
}

enum Stalled {
    Deadline,
    Cancelled,
}

impl ProcessInvoker {
    /// Wait for one drained stream without outliving the deadline.
    fn receive(&self, rx: &Receiver<Vec<u8>>, deadline: Instant) -> Result<Vec<u8>, Stalled> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(Stalled::Cancelled);
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                // last look: the stream may have closed right at the deadline
                return match rx.try_recv() {
                    Ok(buf) => Ok(buf),
                    Err(TryRecvError::Disconnected) => Ok(Vec::new()),
                    Err(TryRecvError::Empty) => Err(Stalled::Deadline),
                };
            }
            match rx.recv_timeout(left.min(POLL_INTERVAL)) {
                Ok(buf) => return Ok(buf),
                Err(RecvTimeoutError::Timeout) => {}
                // reader died without sending
                Err(RecvTimeoutError::Disconnected) => return Ok(Vec::new()),
            }
        }
    }
}

/// Read a stream to its end on a helper thread. The thread is detached: if
/// the pipe outlives the deadline it finishes whenever the writer goes away.
fn drain<R: Read + Send + 'static>(stream: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut s) = stream {
            if let Err(e) = s.read_to_end(&mut buf) {
                warn!("Failed to read child stream: {}", e);
            }
        }
        let _ = tx.send(buf);
    });
    rx
}

/// Kill and reap. Reader threads are left to finish on their own.
fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
