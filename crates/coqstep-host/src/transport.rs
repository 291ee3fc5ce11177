//! Coqtop process transport: spawn, prompt-sentinel framing, async delivery.
//!
//! coqtop speaks a legacy textual protocol whose only structural signal is
//! the prompt it prints after every complete reply. The transport merges the
//! child's stdout and stderr into one pipe (coqtop interleaves replies and
//! prompts across both), and a single background reader thread frames the
//! byte stream on the trailing sentinel and forwards each frame over a
//! channel. Sending never waits for the reply.

use std::io::{self, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::config::CoqtopConfig;
use crate::errors::{SessionError, TransportError};
use crate::resolve::resolve_executable;
use crate::session::ReplTransport;

/// Log target for transport operations.
const TRANSPORT_TARGET: &str = "coqstep_host::transport";

/// Trailing marker coqtop emits after every complete reply.
const PROMPT_SENTINEL: &[u8] = b" < ";

/// Bytes requested per read on the merged output pipe.
const READ_CHUNK: usize = 256;

/// One framed coqtop reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplFrame {
    /// Reply text with the prompt line stripped; may be empty.
    pub output: String,
    /// The trailing prompt line, sentinel included.
    pub prompt: String,
}

/// Events the reader thread delivers to the session.
#[derive(Debug)]
pub enum ReplEvent {
    /// A complete framed reply.
    Reply(ReplFrame),
    /// The output stream closed; no further events follow.
    Closed {
        /// The read error that ended the stream, when there was one.
        error: Option<io::Error>,
    },
}

/// Accumulates raw bytes and cuts a frame whenever the buffered tail
/// matches the prompt sentinel.
#[derive(Debug, Default)]
struct FrameAccumulator {
    buffer: Vec<u8>,
}

impl FrameAccumulator {
    /// Appends a chunk; returns the completed frame when the tail now
    /// matches the sentinel.
    ///
    /// Line endings are normalised to `\n` and the buffer is split at the
    /// last newline into `(output, prompt)`; with no newline the whole
    /// buffer is the prompt and the output is empty. A degenerate empty
    /// frame is skipped.
    fn push(&mut self, bytes: &[u8]) -> Option<ReplFrame> {
        self.buffer.extend_from_slice(bytes);
        if !self.buffer.ends_with(PROMPT_SENTINEL) {
            return None;
        }

        let raw = String::from_utf8_lossy(&self.buffer).replace("\r\n", "\n");
        self.buffer.clear();
        if raw.is_empty() {
            return None;
        }

        Some(match raw.rfind('\n') {
            Some(split) => ReplFrame {
                output: raw[..split].to_owned(),
                prompt: raw[split + 1..].to_owned(),
            },
            None => ReplFrame {
                output: String::new(),
                prompt: raw,
            },
        })
    }
}

/// Owns the coqtop child process and its background reader thread.
pub struct CoqtopTransport {
    child: Child,
    stdin: ChildStdin,
    reader: Option<JoinHandle<()>>,
    stopped: bool,
}

impl CoqtopTransport {
    /// Spawns coqtop and starts the reader thread.
    ///
    /// Framed replies arrive on the returned channel in request order;
    /// coqtop processes one statement fully before its next prompt, so the
    /// session can rely on exactly one outstanding statement at a time.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ExecutableNotFound`] when the configured
    /// command cannot be resolved or launched, and
    /// [`SessionError::SpawnFailed`] for any other start-up failure.
    pub fn spawn(config: &CoqtopConfig) -> Result<(Self, Receiver<ReplEvent>), SessionError> {
        let command_path = resolve_executable(&config.command)?;

        let (pipe_reader, pipe_writer) = io::pipe().map_err(|source| SessionError::SpawnFailed {
            message: "failed to create output pipe".to_owned(),
            source,
        })?;
        let stderr_writer = pipe_writer
            .try_clone()
            .map_err(|source| SessionError::SpawnFailed {
                message: "failed to clone output pipe".to_owned(),
                source,
            })?;

        let mut command = Command::new(&command_path);
        command
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(pipe_writer)
            .stderr(stderr_writer);
        if let Some(dir) = &config.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                SessionError::ExecutableNotFound {
                    command: command_path.display().to_string(),
                }
            } else {
                SessionError::SpawnFailed {
                    message: format!("failed to start {}", command_path.display()),
                    source,
                }
            }
        })?;
        // Release the parent's copies of the write end so the reader sees
        // EOF once coqtop exits.
        drop(command);

        let stdin = child.stdin.take().ok_or_else(|| SessionError::SpawnFailed {
            message: "failed to capture stdin".to_owned(),
            source: io::Error::other("no stdin"),
        })?;

        let (events, replies) = mpsc::channel();
        let reader = thread::Builder::new()
            .name("coqtop-reader".to_owned())
            .spawn(move || reader_loop(pipe_reader, &events))
            .map_err(|source| SessionError::SpawnFailed {
                message: "failed to start reader thread".to_owned(),
                source,
            })?;

        debug!(
            target: TRANSPORT_TARGET,
            pid = child.id(),
            command = %command_path.display(),
            "coqtop process spawned"
        );

        Ok((
            Self {
                child,
                stdin,
                reader: Some(reader),
                stopped: false,
            },
            replies,
        ))
    }

    fn kill_child(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        if let Err(error) = self.child.kill() {
            warn!(target: TRANSPORT_TARGET, %error, "failed to kill coqtop process");
        } else {
            let _ = self.child.wait();
        }
    }
}

impl ReplTransport for CoqtopTransport {
    fn send(&mut self, statement: &str) -> Result<(), TransportError> {
        debug!(target: TRANSPORT_TARGET, statement, "sending statement");
        self.stdin.write_all(statement.as_bytes())?;
        self.stdin.write_all(b"\n")?;
        self.stdin.flush()?;
        Ok(())
    }

    fn shutdown(&mut self) {
        self.kill_child();
        // Killing the child closes the pipe, which unblocks the reader.
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CoqtopTransport {
    fn drop(&mut self) {
        self.kill_child();
    }
}

impl std::fmt::Debug for CoqtopTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoqtopTransport")
            .field("pid", &self.child.id())
            .field("stopped", &self.stopped)
            .finish()
    }
}

/// Blocks on the merged output pipe, framing bytes until the stream closes.
///
/// The loop is the sole owner of the byte accumulator; frames reach the
/// session only through the channel, so no session state is shared with
/// this thread.
fn reader_loop(mut pipe: io::PipeReader, events: &Sender<ReplEvent>) {
    let mut accumulator = FrameAccumulator::default();
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match pipe.read(&mut chunk) {
            Ok(0) => {
                debug!(target: TRANSPORT_TARGET, "coqtop output stream ended");
                let _ = events.send(ReplEvent::Closed { error: None });
                return;
            }
            Ok(read) => {
                if let Some(frame) = accumulator.push(&chunk[..read])
                    && events.send(ReplEvent::Reply(frame)).is_err()
                {
                    // The session dropped its receiver; nothing left to do.
                    return;
                }
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => {
                warn!(target: TRANSPORT_TARGET, %error, "read from coqtop failed");
                let _ = events.send(ReplEvent::Closed { error: Some(error) });
                return;
            }
        }
    }
}
