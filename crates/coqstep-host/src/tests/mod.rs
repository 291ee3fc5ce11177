//! Crate-level behaviour tests for the proof session.

mod support;
