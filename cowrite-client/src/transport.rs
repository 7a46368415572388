//! Transport layer abstraction.
//!
//! The engine never opens sockets itself. A connection handle is injected
//! into the [`Store`](crate::Store) at construction; the owner of the real
//! connection feeds its open/close/receive events back in as
//! [`TransportEvent`]s, one at a time, on the control thread.

use crate::error::ClientResult;
use crate::protocol::{ClientMessage, ServerMessage};

/// Something the store can send whole messages through.
pub trait Transport: Send + Sync {
    /// Sends one message as one frame.
    fn send(&self, message: ClientMessage) -> ClientResult<()>;
}

/// An inbound event from the connection.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The connection is ready to carry messages.
    Opened,
    /// A parsed frame arrived.
    Received(ServerMessage),
    /// The connection is gone. Nothing further will arrive.
    Closed,
}

/// A mock transport for testing.
pub mod mock {
    use super::*;
    use crate::error::ClientError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Mutex, PoisonError};

    /// Records every outbound message instead of sending it.
    #[derive(Debug, Default)]
    pub struct MockTransport {
        sent: Mutex<Vec<ClientMessage>>,
        closed: AtomicBool,
    }

    impl MockTransport {
        /// Creates a new open mock transport.
        pub fn new() -> Self {
            Self::default()
        }

        /// Removes and returns everything sent so far.
        pub fn take_sent(&self) -> Vec<ClientMessage> {
            std::mem::take(&mut *self.sent.lock().unwrap_or_else(PoisonError::into_inner))
        }

        /// Returns a copy of everything sent so far.
        pub fn sent(&self) -> Vec<ClientMessage> {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Makes later sends fail.
        pub fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }

        /// Whether the mock still accepts messages.
        pub fn is_connected(&self) -> bool {
            !self.closed.load(Ordering::SeqCst)
        }
    }

    impl Transport for MockTransport {
        fn send(&self, message: ClientMessage) -> ClientResult<()> {
            if !self.is_connected() {
                return Err(ClientError::Transport("not connected".into()));
            }
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(message);
            Ok(())
        }
    }
}
