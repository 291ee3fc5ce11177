//! Proof session state machine over the stack of accepted statements.

use std::sync::mpsc::{Receiver, TryRecvError};

use coqstep_text::{ScanError, SourceSpan, next_statement, prettify};
use tracing::{debug, warn};

use crate::config::CoqtopConfig;
use crate::errors::{SessionError, TransportError};
use crate::transport::{CoqtopTransport, ReplEvent, ReplFrame};

/// Log target for session operations.
const SESSION_TARGET: &str = "coqstep_host::session";

/// Statement that opens an interactive proof block.
pub const PROOF_OPENER: &str = "Proof.";

/// The four terminal statements that close a proof block.
pub const PROOF_CLOSERS: [&str; 4] = ["Qed.", "Admitted.", "Defined.", "Abort."];

/// Command sent to undo one accepted proof step.
const UNDO_COMMAND: &str = "Undo.";

/// Command sent to abandon the open proof entirely.
const ABORT_COMMAND: &str = "Abort.";

/// Typed decoration handle for one sent statement.
///
/// Wraps the cursor offset captured when the statement was sent; undoing
/// the statement resets the cursor to this offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatementId(usize);

impl StatementId {
    /// The cursor offset the statement was sent from.
    #[must_use]
    pub const fn offset(self) -> usize {
        self.0
    }
}

/// One provisional or committed entry on the statement stack.
#[derive(Debug, Clone)]
pub struct SentStatement {
    /// Decoration handle, keyed by the send-time cursor.
    pub id: StatementId,
    /// The statement text exactly as sent.
    pub text: String,
    /// Source range of the statement, terminator included.
    pub span: SourceSpan,
}

/// Write side of the coqtop connection.
///
/// Seamed as a trait so session behaviour can be exercised against a
/// scripted REPL without spawning a process.
pub trait ReplTransport {
    /// Writes one newline-terminated statement without waiting for the
    /// reply.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] when the child's input stream is
    /// broken.
    fn send(&mut self, statement: &str) -> Result<(), TransportError>;

    /// Terminates the REPL process; the reader unblocks once the stream
    /// closes.
    fn shutdown(&mut self);
}

/// Editor-side feedback: output display and proven-region decorations.
///
/// Purely notifications; the session never consumes a return value from
/// the editor.
pub trait FeedbackSink {
    /// Displays prettified coqtop output.
    fn show_output(&mut self, output: &str);

    /// Marks the statement's source range as proven.
    fn mark_proven(&mut self, id: StatementId, span: SourceSpan);

    /// Clears a previously applied mark.
    fn clear_mark(&mut self, id: StatementId);
}

/// Result of a step-forward request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// A statement was pushed provisionally and sent to coqtop.
    Sent {
        /// Handle of the provisional statement.
        id: StatementId,
    },
    /// No further terminated statement exists; nothing was sent.
    Exhausted,
    /// An unterminated comment blocked the scan; nothing was sent.
    MalformedComment {
        /// Byte offset of the unmatched comment opener.
        opened_at: usize,
    },
}

/// Classification of one framed coqtop reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// The statement was accepted; its mark was applied and the cursor
    /// advanced past its range.
    Accepted {
        /// Handle of the committed statement.
        id: StatementId,
    },
    /// coqtop rejected the statement; the provisional entry was discarded
    /// and the cursor left unchanged.
    Rejected {
        /// Handle of the discarded statement.
        id: StatementId,
    },
    /// A reply with no statement outstanding (start-up banner, echoes of
    /// undo commands after the stack emptied).
    Idle,
}

/// Result of an undo request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoOutcome {
    /// One statement was popped; `Undo.` was sent when it looked like a
    /// tactic.
    SteppedBack {
        /// Handle of the popped statement.
        id: StatementId,
    },
    /// The proof opener was popped along with the statement beneath it,
    /// and `Abort.` was sent.
    ProofAborted,
    /// Undo outside an active proof is a no-op.
    NotInProof,
    /// Nothing left on the stack to undo.
    NothingToUndo,
}

/// An interactive stepping session against one coqtop process.
///
/// The session owns the cursor, the proof-nesting flag, and the statement
/// stack exclusively. The transport's reader thread communicates only
/// through the reply channel, so every state mutation happens on the
/// caller's thread and no lock is needed. The session relies on one
/// outstanding unacknowledged statement at a time; suppressing re-entrant
/// stepping while a reply is pending is the calling layer's job.
pub struct ProofSession<T: ReplTransport> {
    transport: T,
    replies: Receiver<ReplEvent>,
    cursor: usize,
    in_proof: bool,
    stack: Vec<SentStatement>,
}

impl ProofSession<CoqtopTransport> {
    /// Starts a fresh session by spawning coqtop per `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ExecutableNotFound`] or
    /// [`SessionError::SpawnFailed`] when coqtop cannot be launched;
    /// surfaced to the user, never retried.
    pub fn start(config: &CoqtopConfig) -> Result<Self, SessionError> {
        let (transport, replies) = CoqtopTransport::spawn(config)?;
        Ok(Self::with_transport(transport, replies))
    }
}

impl<T: ReplTransport> ProofSession<T> {
    /// Builds a session over an already-connected transport and its reply
    /// channel.
    #[must_use]
    pub fn with_transport(transport: T, replies: Receiver<ReplEvent>) -> Self {
        Self {
            transport,
            replies,
            cursor: 0,
            in_proof: false,
            stack: Vec::new(),
        }
    }

    /// Current scan offset into the source.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether an interactive proof block is open.
    #[must_use]
    pub const fn in_proof(&self) -> bool {
        self.in_proof
    }

    /// The stack of sent statements, oldest first.
    #[must_use]
    pub fn statements(&self) -> &[SentStatement] {
        &self.stack
    }

    /// Scans the next statement at the cursor and sends it provisionally.
    ///
    /// The cursor does not advance here; it moves only when the reply
    /// confirms acceptance. Scan exhaustion and an unterminated comment
    /// mutate nothing and are reported as outcomes, not errors.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] when the statement cannot be
    /// written to coqtop.
    pub fn step_forward(&mut self, source: &str) -> Result<StepOutcome, SessionError> {
        let scanned = match next_statement(source, self.cursor) {
            Ok(Some(statement)) => statement,
            Ok(None) => {
                debug!(target: SESSION_TARGET, cursor = self.cursor, "no further statement");
                return Ok(StepOutcome::Exhausted);
            }
            Err(ScanError::UnterminatedComment { opened_at }) => {
                warn!(target: SESSION_TARGET, opened_at, "unterminated comment blocks the scan");
                return Ok(StepOutcome::MalformedComment { opened_at });
            }
        };

        if scanned.text == PROOF_OPENER {
            self.in_proof = true;
        } else if PROOF_CLOSERS.contains(&scanned.text.as_str()) {
            self.in_proof = false;
        }

        let id = StatementId(self.cursor);
        debug!(
            target: SESSION_TARGET,
            offset = id.offset(),
            statement = %scanned.text,
            "sending statement"
        );
        self.stack.push(SentStatement {
            id,
            text: scanned.text.clone(),
            span: scanned.span,
        });
        self.transport.send(&scanned.text)?;
        Ok(StepOutcome::Sent { id })
    }

    /// Applies one framed reply to the session.
    ///
    /// The output is prettified and surfaced first. A line beginning
    /// `Error:` or `Syntax error:` anywhere in it rejects the provisional
    /// statement: popped, cursor unchanged, nothing retried. Any other
    /// reply commits the top of the stack: its mark is applied and the
    /// cursor advances one past its range.
    pub fn receive<F: FeedbackSink>(&mut self, frame: &ReplFrame, sink: &mut F) -> ReplyOutcome {
        let output = prettify(&frame.output);
        if !output.is_empty() {
            sink.show_output(&output);
        }

        if is_failure(&output) {
            let Some(rejected) = self.stack.pop() else {
                warn!(target: SESSION_TARGET, "failure reply with no statement outstanding");
                return ReplyOutcome::Idle;
            };
            warn!(target: SESSION_TARGET, statement = %rejected.text, "statement rejected");
            ReplyOutcome::Rejected { id: rejected.id }
        } else {
            let Some(committed) = self.stack.last() else {
                return ReplyOutcome::Idle;
            };
            sink.mark_proven(committed.id, committed.span);
            self.cursor = committed.span.end + 1;
            ReplyOutcome::Accepted { id: committed.id }
        }
    }

    /// Drains every reply the reader thread has already delivered.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ConnectionLost`] once the output stream has
    /// closed; the session must then be torn down.
    pub fn process_replies<F: FeedbackSink>(
        &mut self,
        sink: &mut F,
    ) -> Result<Vec<ReplyOutcome>, SessionError> {
        let mut outcomes = Vec::new();
        loop {
            let event = self.replies.try_recv();
            match event {
                Ok(ReplEvent::Reply(frame)) => outcomes.push(self.receive(&frame, sink)),
                Ok(ReplEvent::Closed { error }) => {
                    return Err(SessionError::ConnectionLost { source: error });
                }
                Err(TryRecvError::Empty) => return Ok(outcomes),
                Err(TryRecvError::Disconnected) => {
                    return Err(SessionError::ConnectionLost { source: None });
                }
            }
        }
    }

    /// Blocks until the next reply arrives and applies it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ConnectionLost`] once the output stream has
    /// closed.
    pub fn wait_for_reply<F: FeedbackSink>(
        &mut self,
        sink: &mut F,
    ) -> Result<ReplyOutcome, SessionError> {
        let event = self.replies.recv();
        match event {
            Ok(ReplEvent::Reply(frame)) => Ok(self.receive(&frame, sink)),
            Ok(ReplEvent::Closed { error }) => Err(SessionError::ConnectionLost { source: error }),
            Err(_) => Err(SessionError::ConnectionLost { source: None }),
        }
    }

    /// Steps one statement back.
    ///
    /// Outside an active proof this is a no-op, with one exception: a
    /// proof-closing keyword on top of the stack re-enters the proof it
    /// closed and is then undone like any other entry. Routing follows the
    /// popped text: the proof opener abandons the whole proof (the
    /// statement beneath it is popped too and `Abort.` sent), a
    /// lowercase-initial statement is treated as a tactic and undone with
    /// `Undo.`, and anything else needs no coqtop-side command. The
    /// lowercase heuristic mirrors the script convention that tactics are
    /// lowercase-initial; a capitalised tactic would be misrouted.
    /// Commands sent here are never pushed on the stack.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] when an undo command cannot be
    /// written to coqtop.
    pub fn undo<F: FeedbackSink>(&mut self, sink: &mut F) -> Result<UndoOutcome, SessionError> {
        if !self.in_proof {
            let closer_on_top = self
                .stack
                .last()
                .is_some_and(|statement| PROOF_CLOSERS.contains(&statement.text.as_str()));
            if !closer_on_top {
                return Ok(UndoOutcome::NotInProof);
            }
            self.in_proof = true;
        }

        let Some(popped) = self.stack.pop() else {
            return Ok(UndoOutcome::NothingToUndo);
        };

        if popped.text == PROOF_OPENER {
            sink.clear_mark(popped.id);
            self.cursor = popped.id.offset();
            self.in_proof = false;
            if let Some(beneath) = self.stack.pop() {
                debug!(target: SESSION_TARGET, "abandoning open proof");
                self.transport.send(ABORT_COMMAND)?;
                sink.clear_mark(beneath.id);
                self.cursor = beneath.id.offset();
            }
            return Ok(UndoOutcome::ProofAborted);
        }

        if starts_lowercase(&popped.text) {
            debug!(target: SESSION_TARGET, statement = %popped.text, "undoing tactic");
            self.transport.send(UNDO_COMMAND)?;
        }
        sink.clear_mark(popped.id);
        self.cursor = popped.id.offset();
        Ok(UndoOutcome::SteppedBack { id: popped.id })
    }

    /// Ends the session: clears every remaining mark, resets the state,
    /// and shuts the transport down.
    pub fn teardown<F: FeedbackSink>(&mut self, sink: &mut F) {
        for statement in self.stack.drain(..) {
            sink.clear_mark(statement.id);
        }
        self.cursor = 0;
        self.in_proof = false;
        debug!(target: SESSION_TARGET, "session torn down");
        self.transport.shutdown();
    }
}

/// Whether any line of the reply starts with a failure marker.
fn is_failure(output: &str) -> bool {
    output.lines().any(|line| {
        line.starts_with("Error:")
            || line.starts_with("Syntax error:")
            || line.starts_with("Syntax Error:")
    })
}

fn starts_lowercase(text: &str) -> bool {
    text.chars().next().is_some_and(char::is_lowercase)
}
