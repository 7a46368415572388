//! Client engine for Cowrite, a collaborative editing system.
//!
//! Many agents edit shared text and scalar values hosted behind a relay
//! authority. Every replica applies the authority's patch stream in the
//! same order and converges to the same state.
//!
//! # Architecture
//!
//! ## Components
//!
//! - **Value**: replicated values ([`Register`], [`TextValue`]) sharing one
//!   optimistic-concurrency contract
//! - **Event**: per-value event streams and the outbound patch wire
//! - **Protocol**: the JSON messages exchanged with the authority
//! - **Transport**: the seam to the connection, plus a mock for tests
//! - **Store**: the key-value replica multiplexing values over one stream
//! - **Driver**: a tokio channel pump feeding transport events to the store
//!
//! ## Edit Round Trip
//!
//! 1. **Request**: a local mutation emits a patch and takes the value's
//!    edit token; further local edits fail with `Paused`
//! 2. **Placement**: the authority mints Pids for inserted text
//! 3. **Broadcast**: the authoritative patch reaches every subscriber
//! 4. **Apply**: each replica applies it; the echo releases the token
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use cowrite_client::{Store, StoreConfig, transport::mock::MockTransport};
//!
//! let transport = Arc::new(MockTransport::new());
//! let config = StoreConfig {
//!     name: "editor".to_string(),
//!     ..Default::default()
//! };
//!
//! let store = Store::with_config(transport, config);
//! assert!(!store.is_ready());
//! ```

pub mod driver;
mod error;
pub mod event;
pub mod protocol;
pub mod registry;
mod store;
pub mod transport;
pub mod value;

pub use error::{ClientError, ClientResult};
pub use event::{PatchSink, SelectionChanged, TextReplaced, ValueEvent, ValueSet};
pub use protocol::{ClientMessage, ServerMessage};
pub use store::{Store, StoreConfig};
pub use transport::{Transport, TransportEvent};
pub use value::{Register, RegisterSnapshot, TextValue, Value};

pub use cowrite_crdt::{Op, Pid, VersionVector};
pub use cowrite_types::{AgentId, DType};
