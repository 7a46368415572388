//! Error types for decoding position identifiers and operations.

use thiserror::Error;

/// Result type for decode operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Malformed wire input. Always fatal to the decode call that produced it.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A position identifier string did not match `pos.agent:...~seq`.
    #[error("invalid pid: {0}")]
    InvalidPid(String),

    /// An operation string had too few fields or a bad field.
    #[error("failed to parse op: {0}")]
    InvalidOp(String),

    /// The leading tag of an operation string is not `ci`, `i` or `d`.
    #[error("unknown op type: {0}")]
    UnknownOpType(String),

    /// The patch or snapshot is not the expected JSON shape.
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
}
