//! Statement scanning over Coq proof-script source.

use thiserror::Error;

/// Two-character block-comment opener.
const COMMENT_OPEN: &[u8] = b"(*";
/// Two-character block-comment closer.
const COMMENT_CLOSE: &[u8] = b"*)";

/// A half-open byte range within the scanned source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive); one past the statement terminator.
    pub end: usize,
}

impl SourceSpan {
    /// Creates a span from byte offsets.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of bytes covered by the span.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the span covers no bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// One scanned statement together with its location in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedStatement {
    /// The statement text, terminator included.
    pub text: String,
    /// Byte range of the text within the source.
    pub span: SourceSpan,
}

/// Errors raised while scanning for the next statement.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ScanError {
    /// A block comment was still open when the source ended.
    #[error("unterminated comment opened at byte {opened_at}")]
    UnterminatedComment {
        /// Byte offset of the outermost unmatched opener.
        opened_at: usize,
    },
}

/// Finds the next statement at or after `from`.
///
/// Leading whitespace and block comments are skipped first. Comments nest:
/// every `(*` increments and every `*)` decrements a depth counter, with the
/// two-character delimiters tokenised left-to-right so no character belongs
/// to both an opener and the closer after it (`(*)` therefore opens a
/// comment without closing it). The statement runs from the first
/// non-skipped byte through the first `.` that is followed by whitespace or
/// end of input.
///
/// Returns `Ok(None)` when the source holds no further terminated statement;
/// the caller must treat that as "nothing to do" and leave its cursor alone.
///
/// # Errors
///
/// Returns [`ScanError::UnterminatedComment`] when end of input is reached
/// while a comment is still open.
pub fn next_statement(
    source: &str,
    from: usize,
) -> Result<Option<ScannedStatement>, ScanError> {
    let bytes = source.as_bytes();
    let mut pos = from.min(bytes.len());

    pos = skip_whitespace(bytes, pos);
    while lookahead(bytes, pos, COMMENT_OPEN) {
        pos = skip_comment(bytes, pos)?;
        pos = skip_whitespace(bytes, pos);
    }

    let start = pos;
    let Some(end) = find_terminator(bytes, start) else {
        return Ok(None);
    };

    Ok(Some(ScannedStatement {
        text: source[start..end].to_owned(),
        span: SourceSpan::new(start, end),
    }))
}

fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while bytes.get(pos).is_some_and(u8::is_ascii_whitespace) {
        pos += 1;
    }
    pos
}

fn lookahead(bytes: &[u8], pos: usize, token: &[u8]) -> bool {
    bytes.get(pos..pos + token.len()) == Some(token)
}

/// Consumes a balanced comment starting at `opened_at` and returns the
/// offset just past its closer.
fn skip_comment(bytes: &[u8], opened_at: usize) -> Result<usize, ScanError> {
    let mut pos = opened_at + COMMENT_OPEN.len();
    let mut depth = 1usize;
    while depth > 0 {
        if lookahead(bytes, pos, COMMENT_OPEN) {
            depth += 1;
            pos += COMMENT_OPEN.len();
        } else if lookahead(bytes, pos, COMMENT_CLOSE) {
            depth -= 1;
            pos += COMMENT_CLOSE.len();
        } else if pos < bytes.len() {
            pos += 1;
        } else {
            return Err(ScanError::UnterminatedComment { opened_at });
        }
    }
    Ok(pos)
}

/// Returns the offset just past the first terminator `.` at or after `from`,
/// where a terminator must be followed by whitespace or end of input.
fn find_terminator(bytes: &[u8], from: usize) -> Option<usize> {
    let mut pos = from;
    while pos < bytes.len() {
        if bytes[pos] == b'.'
            && bytes
                .get(pos + 1)
                .is_none_or(|byte| byte.is_ascii_whitespace())
        {
            return Some(pos + 1);
        }
        pos += 1;
    }
    None
}
