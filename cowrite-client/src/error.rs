//! Error types for the client engine.

use cowrite_crdt::ParseError;
use cowrite_types::DType;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Malformed Pid, operation, patch or encoded value.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Unknown message type or dtype, or a message out of protocol order.
    /// Signals a version mismatch with the authority.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A local mutation was attempted while another is awaiting its echo.
    #[error("paused: a local edit is awaiting acknowledgment")]
    Paused,

    /// A replace range falls outside the current text.
    #[error("out of bounds: cannot replace {len} at {pos} in text of length {size}")]
    OutOfBounds { pos: usize, len: usize, size: usize },

    /// No value is stored under the key.
    #[error("not found: {0}")]
    NotFound(String),

    /// The stored value has a different dtype than requested.
    #[error("dtype mismatch for {key}: expected {expected}, found {actual}")]
    DTypeMismatch {
        key: String,
        expected: DType,
        actual: DType,
    },

    /// The operation exists in the API but has no implementation.
    #[error("not implemented: {0}")]
    Unimplemented(&'static str),

    /// The transport refused an outbound message.
    #[error("transport error: {0}")]
    Transport(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Returns true if the caller may simply retry later.
    ///
    /// Only [`ClientError::Paused`] qualifies: it clears once the pending
    /// edit is acknowledged. Everything else is a caller bug or a
    /// desynchronized replica.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ClientError::Paused)
    }
}
