//! Event pump between a connection and the store.
//!
//! A socket reader running on any task parses frames and pushes
//! [`TransportEvent`]s into an unbounded channel; the control task owns the
//! [`Store`] and drains the channel, so the store sees exactly one event at
//! a time in delivery order.
//!
//! ```text
//! socket reader ──► TransportEvent ──► run() / drain() ──► Store
//! Store ──► ChannelTransport ──► ClientMessage ──► socket writer
//! ```

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::protocol::ClientMessage;
use crate::store::Store;
use crate::transport::{Transport, TransportEvent};

/// Channel sender for the connection side.
pub type EventSender = mpsc::UnboundedSender<TransportEvent>;

/// Channel receiver for the control side.
pub type EventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// Creates a new event channel pair.
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// A [`Transport`] that hands outbound messages to a socket writer task.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<ClientMessage>,
}

impl ChannelTransport {
    /// Creates the transport and the receiver the writer task reads from.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<ClientMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Transport for ChannelTransport {
    fn send(&self, message: ClientMessage) -> ClientResult<()> {
        self.tx
            .send(message)
            .map_err(|_| ClientError::Transport("writer hung up".into()))
    }
}

/// Feeds events to the store until `Closed` arrives or every sender is
/// gone. Returns the number of events handled.
///
/// Stops at the first event the store rejects.
pub async fn run(store: &mut Store, events: &mut EventReceiver) -> ClientResult<usize> {
    let mut handled = 0;
    while let Some(event) = events.recv().await {
        let closed = matches!(event, TransportEvent::Closed);
        store.handle_event(event)?;
        handled += 1;
        if closed {
            break;
        }
    }
    debug!(store = %store.config().name, handled, "event pump stopped");
    Ok(handled)
}

/// Handles every event already queued, without waiting for more.
pub fn drain(store: &mut Store, events: &mut EventReceiver) -> ClientResult<usize> {
    let mut handled = 0;
    while let Ok(event) = events.try_recv() {
        store.handle_event(event)?;
        handled += 1;
    }
    Ok(handled)
}
