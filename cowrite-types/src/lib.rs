//! Core type definitions for Cowrite.
//!
//! This crate defines the small, shared vocabulary used by the sequence model
//! and the client engine:
//! - Agent identifiers minted by the allocation authority
//! - Data type tags that name the kind of a replicated value
//!
//! Everything that carries behaviour (position identifiers, operations,
//! values, the store) lives in `cowrite-crdt` and `cowrite-client`.

mod dtype;
mod ids;

pub use dtype::DType;
pub use ids::AgentId;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("unknown dtype: {0}")]
    UnknownDType(String),

    #[error("invalid agent id: {0}")]
    InvalidAgentId(String),
}
