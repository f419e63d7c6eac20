//! Error types of the completion engine

use std::time::Duration;

/// Request-level completion failures, reported to the editor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    /// The cursor position does not map to any syntax node.
    #[error("cannot find corresponding node on given position")]
    NodeNotFound,
}

/// Failures talking to the package-index evaluator.
///
/// None of these fail an editor request: completion falls back to local names
/// and resolve returns the item unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    /// The evaluator is not running, exited, or its channel closed.
    #[error("package index unavailable: {0}")]
    Unavailable(String),
    /// The evaluator replied with something that does not decode.
    #[error("malformed reply from package index: {0}")]
    MalformedReply(String),
    /// The evaluator reported an error for this request.
    #[error("package index reported error {code}: {message}")]
    Remote { code: i64, message: String },
    /// No reply arrived within the configured timeout.
    #[error("package index did not reply within {0:?}")]
    TimedOut(Duration),
}

/// A resumption token carried by a completion item cannot be decoded.
#[derive(Debug, thiserror::Error)]
pub enum TokenDecodeError {
    #[error("invalid resume token: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported resume token version {0}")]
    UnsupportedVersion(u32),
}

/// Why a resolve request returned its item unenriched.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Token(#[from] TokenDecodeError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("no package index configured")]
    NoIndex,
}

/// An edit notification that cannot be applied to the stored document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("version {version} not newer than {current}")]
    StaleVersion { version: i32, current: i32 },
    #[error("position {line}:{character} is outside the document")]
    OutOfRange { line: u32, character: u32 },
}
