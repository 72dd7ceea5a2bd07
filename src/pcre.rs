//! Regex engine failure translation.
//!
//! PHPDoc tooling historically reports pattern-matching failures through a
//! numeric status code (the `preg_last_error()` table).  This module maps
//! those codes to [`PcreError`], a typed error with a fixed, human-readable
//! message, and provides a few checked helpers so that the tokenizer and
//! the tag handlers surface engine problems through the same table instead
//! of panicking or re-deriving messages at each call site.
//!
//! # Code table
//!
//! | code | [`PcreErrorCode`]  | message                   |
//! |------|--------------------|---------------------------|
//! | 0    | `NoError`          | `Unknown Pcre error`      |
//! | 1    | `Internal`         | `Unknown Pcre error`      |
//! | 2    | `BacktrackLimit`   | `Backtrack limit error`   |
//! | 3    | `RecursionLimit`   | `Recursion limit error`   |
//! | 4    | `BadUtf8`          | `Bad UTF8 error`          |
//! | 5    | `BadUtf8Offset`    | `Bad UTF8 offset error`   |
//! | 6    | `JitStackLimit`    | `Jit stacklimit error`    |
//! | else | (any)              | `Unknown Pcre error`      |
//!
//! Translating `NoError` yields the unknown error as well.  Asking for a
//! translation when nothing failed is a caller bug, and callers rely on
//! always getting a typed error back.

use regex::{Captures, Regex, RegexBuilder};
use serde::Serialize;

/// Compiled-program size limit for patterns built through [`compile`].
pub const SIZE_LIMIT: usize = 1 << 20;

/// Default nesting limit for [`find_balanced`].
pub const MAX_NESTING_DEPTH: usize = 64;

/// Status codes of the pattern-matching engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(i32)]
pub enum PcreErrorCode {
    NoError = 0,
    Internal = 1,
    BacktrackLimit = 2,
    RecursionLimit = 3,
    BadUtf8 = 4,
    BadUtf8Offset = 5,
    JitStackLimit = 6,
}

impl PcreErrorCode {
    /// Look up a raw status code.  Returns `None` for codes outside the
    /// engine's table.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::NoError),
            1 => Some(Self::Internal),
            2 => Some(Self::BacktrackLimit),
            3 => Some(Self::RecursionLimit),
            4 => Some(Self::BadUtf8),
            5 => Some(Self::BadUtf8Offset),
            6 => Some(Self::JitStackLimit),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }
}

/// A translated engine failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PcreError {
    #[error("Backtrack limit error")]
    BacktrackLimit,
    #[error("Recursion limit error")]
    RecursionLimit,
    #[error("Bad UTF8 error")]
    BadUtf8,
    #[error("Bad UTF8 offset error")]
    BadUtf8Offset,
    #[error("Jit stacklimit error")]
    JitStackLimit,
    /// Internal faults, the no-error code and anything outside the table.
    /// `code` keeps the raw status for diagnostics.
    #[error("Unknown Pcre error")]
    Unknown { code: i32 },
}

impl PcreError {
    /// The raw status code this error was translated from.
    pub fn code(&self) -> i32 {
        match self {
            Self::BacktrackLimit => PcreErrorCode::BacktrackLimit.code(),
            Self::RecursionLimit => PcreErrorCode::RecursionLimit.code(),
            Self::BadUtf8 => PcreErrorCode::BadUtf8.code(),
            Self::BadUtf8Offset => PcreErrorCode::BadUtf8Offset.code(),
            Self::JitStackLimit => PcreErrorCode::JitStackLimit.code(),
            Self::Unknown { code } => *code,
        }
    }
}

/// Translate an engine status code into a typed error.
///
/// Total over `i32`: every code yields an error, unknown ones included.
pub fn translate(code: i32) -> PcreError {
    match PcreErrorCode::from_code(code) {
        Some(PcreErrorCode::BacktrackLimit) => PcreError::BacktrackLimit,
        Some(PcreErrorCode::RecursionLimit) => PcreError::RecursionLimit,
        Some(PcreErrorCode::BadUtf8) => PcreError::BadUtf8,
        Some(PcreErrorCode::BadUtf8Offset) => PcreError::BadUtf8Offset,
        Some(PcreErrorCode::JitStackLimit) => PcreError::JitStackLimit,
        Some(PcreErrorCode::Internal | PcreErrorCode::NoError) | None => {
            PcreError::Unknown { code }
        }
    }
}

impl From<PcreErrorCode> for PcreError {
    fn from(code: PcreErrorCode) -> Self {
        translate(code.code())
    }
}

// ─── Checked helpers ────────────────────────────────────────────────────────

/// Compile `pattern` with the crate's size limit.
///
/// Exceeding the size limit is the `regex` crate's equivalent of runaway
/// backtracking and is reported as [`PcreError::BacktrackLimit`]; any other
/// compile failure is an internal fault.
pub fn compile(pattern: &str) -> Result<Regex, PcreError> {
    RegexBuilder::new(pattern)
        .size_limit(SIZE_LIMIT)
        .build()
        .map_err(|err| {
            let code = match err {
                regex::Error::CompiledTooBig(_) => PcreErrorCode::BacktrackLimit,
                _ => PcreErrorCode::Internal,
            };
            tracing::debug!(pattern, error = %err, "pattern failed to compile");
            translate(code.code())
        })
}

/// Decode a raw subject as UTF-8.
pub fn decode(subject: &[u8]) -> Result<&str, PcreError> {
    std::str::from_utf8(subject).map_err(|_| PcreError::BadUtf8)
}

/// Run `re` against `subject` starting at byte `offset`.
///
/// The offset must lie on a character boundary inside (or at the end of)
/// the subject.
pub fn captures_at<'h>(
    re: &Regex,
    subject: &'h str,
    offset: usize,
) -> Result<Option<Captures<'h>>, PcreError> {
    if offset > subject.len() || !subject.is_char_boundary(offset) {
        return Err(PcreError::BadUtf8Offset);
    }
    Ok(re.captures_at(subject, offset))
}

/// Find the byte index of the `close` that balances the `open` at
/// `start`, honouring nesting.
///
/// Returns `Ok(None)` when the opener is never closed, and
/// [`PcreError::RecursionLimit`] once nesting exceeds `max_depth`.
pub fn find_balanced(
    text: &str,
    start: usize,
    open: char,
    close: char,
    max_depth: usize,
) -> Result<Option<usize>, PcreError> {
    if start > text.len() || !text.is_char_boundary(start) {
        return Err(PcreError::BadUtf8Offset);
    }
    let mut depth = 0usize;
    for (i, c) in text[start..].char_indices() {
        if c == open {
            depth += 1;
            if depth > max_depth {
                return Err(PcreError::RecursionLimit);
            }
        } else if c == close {
            // A closer before any opener cannot balance anything.
            if depth == 0 {
                return Ok(None);
            }
            depth -= 1;
            if depth == 0 {
                return Ok(Some(start + i));
            }
        }
    }
    Ok(None)
}
