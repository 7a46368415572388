//! Sequence CRDT primitives for Cowrite.
//!
//! This crate provides the replicated data model shared by every client:
//!
//! - [`Pid`]: dense, totally ordered position identifier (Logoot style)
//! - [`Op`]: insert requests, authoritative inserts and deletes, plus the
//!   patch codec that carries them over the wire
//! - [`Sequence<T>`]: ordered atom list keyed by [`Pid`]
//! - [`VersionVector`]: per-agent sequence numbers used as register
//!   provenance
//!
//! Placement inside a [`Sequence`] depends only on Pid order, never on the
//! index an operation was issued against. Any application order of the same
//! set of inserts and deletes therefore yields the same final sequence.

mod error;
mod op;
mod pid;
mod sequence;
mod version_vector;

pub use error::{ParseError, ParseResult};
pub use op::{decode_patch, encode_patch, Op};
pub use pid::{Id, Pid};
pub use sequence::{Atom, Sequence};
pub use version_vector::{CausalOrder, VersionVector};
