//! Pure text processing for Coq proof scripts.
#![deny(missing_docs)]
//!
//! The crate hosts the two transforms the stepping host needs that touch no
//! I/O at all: scanning a proof script into discrete statements (skipping
//! nested block comments) and prettifying coqtop output with notation glyphs
//! for display. Both operate on plain `&str` so the editor's buffer can be
//! handed over without copies or adapters.

mod pretty;
mod scan;

pub use pretty::prettify;
pub use scan::{ScanError, ScannedStatement, SourceSpan, next_statement};
