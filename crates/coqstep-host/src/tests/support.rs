//! Shared fixtures and recording doubles for session tests.

use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};

use crate::errors::TransportError;
use crate::session::{FeedbackSink, ProofSession, ReplTransport, StatementId};
use crate::transport::{ReplEvent, ReplFrame};

use coqstep_text::SourceSpan;

/// Scripted REPL transport that records every statement written to it.
#[derive(Clone, Default)]
pub struct ScriptedRepl {
    shared: Arc<Mutex<ScriptedState>>,
}

#[derive(Default)]
struct ScriptedState {
    sent: Vec<String>,
    shutdowns: usize,
    fail_sends: bool,
}

impl ScriptedRepl {
    /// Returns a handle for asserting recorded calls.
    pub fn handle(&self) -> ScriptedReplHandle {
        ScriptedReplHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Makes every subsequent send fail with a broken-pipe error.
    pub fn fail_sends(&self) {
        self.shared.lock().expect("poisoned").fail_sends = true;
    }
}

impl ReplTransport for ScriptedRepl {
    fn send(&mut self, statement: &str) -> Result<(), TransportError> {
        let mut state = self.shared.lock().expect("poisoned");
        if state.fail_sends {
            return Err(TransportError::Io(std::io::Error::from(
                std::io::ErrorKind::BrokenPipe,
            )));
        }
        state.sent.push(statement.to_owned());
        Ok(())
    }

    fn shutdown(&mut self) {
        self.shared.lock().expect("poisoned").shutdowns += 1;
    }
}

/// Assertion handle over a [`ScriptedRepl`]'s recorded calls.
pub struct ScriptedReplHandle {
    shared: Arc<Mutex<ScriptedState>>,
}

impl ScriptedReplHandle {
    /// Every statement written, in order.
    pub fn sent(&self) -> Vec<String> {
        self.shared.lock().expect("poisoned").sent.clone()
    }

    /// Number of shutdown calls.
    pub fn shutdowns(&self) -> usize {
        self.shared.lock().expect("poisoned").shutdowns
    }
}

/// Feedback sink that records output and mark operations.
#[derive(Default)]
pub struct RecordingSink {
    /// Prettified outputs shown, in order.
    pub outputs: Vec<String>,
    /// Proven marks applied, in order.
    pub marks: Vec<(StatementId, SourceSpan)>,
    /// Marks cleared, in order.
    pub cleared: Vec<StatementId>,
}

impl FeedbackSink for RecordingSink {
    fn show_output(&mut self, output: &str) {
        self.outputs.push(output.to_owned());
    }

    fn mark_proven(&mut self, id: StatementId, span: SourceSpan) {
        self.marks.push((id, span));
    }

    fn clear_mark(&mut self, id: StatementId) {
        self.cleared.push(id);
    }
}

/// A session over a scripted REPL, its assertion handle, and the sender
/// side of the reply channel.
pub fn scripted_session() -> (
    ProofSession<ScriptedRepl>,
    ScriptedReplHandle,
    Sender<ReplEvent>,
) {
    let repl = ScriptedRepl::default();
    let handle = repl.handle();
    let (events, replies) = mpsc::channel();
    (ProofSession::with_transport(repl, replies), handle, events)
}

/// Wraps output in a frame the way the transport would deliver it.
pub fn reply(output: &str) -> ReplFrame {
    ReplFrame {
        output: output.to_owned(),
        prompt: "Coq < ".to_owned(),
    }
}
