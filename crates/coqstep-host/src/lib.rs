//! Interactive coqtop proof-stepping host.
#![deny(missing_docs)]
//!
//! The crate owns one coqtop process per session and drives it a statement
//! at a time: scan the next terminated statement, send it, and commit or
//! roll back when the framed reply arrives. The [`ProofSession`] holds the
//! cursor, the proof-nesting flag, and the stack of sent statements; editor
//! integrations supply a [`FeedbackSink`] for output display and proven
//! marks. The process side sits behind the [`ReplTransport`] trait so
//! session behaviour can be tested against a scripted REPL.

mod config;
mod errors;
mod resolve;
mod session;
mod transport;

pub use config::CoqtopConfig;
pub use errors::{SessionError, TransportError};
pub use resolve::resolve_executable;
pub use session::{
    FeedbackSink, PROOF_CLOSERS, PROOF_OPENER, ProofSession, ReplTransport, ReplyOutcome,
    SentStatement, StatementId, StepOutcome, UndoOutcome,
};
pub use transport::{CoqtopTransport, ReplEvent, ReplFrame};

#[cfg(test)]
mod tests;
