//! Crate-wide error type.
//!
//! Only a handful of operations can fail at all: building AST values with
//! bad arguments, resolving a handler id that is not in the standard
//! catalog, loading a configuration file, regex engine failures surfaced
//! by the tokenizer and JSON output in the command line tool.  Tag recognition itself never fails; see
//! [`TagFactory::create`](crate::docblock::TagFactory::create).

use std::path::PathBuf;

use crate::pcre::PcreError;

/// Error type for docblock operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A value was constructed with an argument that violates its invariants
    /// (e.g. an empty tag name).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A handler id that the standard catalog does not know.
    #[error("unknown tag handler id: {0}")]
    UnknownHandler(String),

    /// The regex engine (or the UTF-8 checks guarding it) failed.
    #[error(transparent)]
    Pcre(#[from] PcreError),

    /// A configuration file exists but could not be understood.
    #[error("invalid configuration in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    /// Writing a docblock out as JSON failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for docblock operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_failures_keep_their_own_variant() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::from(source);
        assert!(matches!(err, Error::Json(_)));
        assert!(err.to_string().starts_with("failed to serialize output: "));
    }
}
