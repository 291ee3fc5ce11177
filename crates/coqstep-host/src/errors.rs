//! Error types surfaced by the proof session and its transport.

use std::io;

use thiserror::Error;

/// Transport-layer errors on the coqtop pipes.
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error during read or write.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors returned by [`crate::ProofSession`] and session start-up.
///
/// Only the unrecoverable conditions live here. A rejected statement, an
/// exhausted script, and an unterminated comment are step outcomes, not
/// errors: they roll the state machine back (or leave it alone) without
/// crossing to the caller as failures.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The coqtop binary was not found at the configured path or on PATH.
    #[error("coqtop executable not found: {command}")]
    ExecutableNotFound {
        /// The command that could not be resolved.
        command: String,
    },

    /// The coqtop process could not be started.
    #[error("failed to spawn coqtop process: {message}")]
    SpawnFailed {
        /// Description of the spawn failure.
        message: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Send-side transport failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The coqtop output stream closed; the session must be torn down.
    #[error("coqtop output stream closed")]
    ConnectionLost {
        /// The read error that ended the stream, when there was one.
        #[source]
        source: Option<io::Error>,
    },
}
