//! Per-value event channels.
//!
//! Every replicated value owns an [`Emitter`]. Consumers (editor bindings,
//! views) call `subscribe()` and receive a typed stream of [`ValueEvent`]s;
//! the store attaches exactly one [`PatchSink`] that forwards outbound
//! patches to the transport.

use std::fmt;

use tokio::sync::mpsc;
use tracing::warn;

use crate::error::ClientResult;

/// The text of a value changed over `[pos, pos + len)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextReplaced {
    pub is_local: bool,
    pub pos: usize,
    pub len: usize,
    pub value: String,
}

/// The selection of a text value moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChanged {
    pub is_local: bool,
    pub start: usize,
    pub end: usize,
}

/// A register adopted a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSet {
    pub is_local: bool,
    pub value: serde_json::Value,
}

/// Something that happened to a replicated value.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueEvent {
    /// A local mutation produced this encoded patch for the authority.
    Patch(String),
    /// Text was replaced (text values only).
    TextReplaced(TextReplaced),
    /// Selection moved (text values only).
    SelectionChanged(SelectionChanged),
    /// Register value was replaced (registers only).
    ValueSet(ValueSet),
}

/// Outbound delivery of a value's patches.
pub trait PatchSink: Send + Sync {
    /// Delivers one encoded patch.
    fn deliver(&self, patch: &str) -> ClientResult<()>;
}

/// Fan-out of events to subscribers plus the single outbound wire.
#[derive(Default)]
pub struct Emitter {
    subscribers: Vec<mpsc::UnboundedSender<ValueEvent>>,
    sink: Option<Box<dyn PatchSink>>,
}

impl Emitter {
    /// Creates an emitter with no subscribers and no outbound wire.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new event stream.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ValueEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.iter().filter(|tx| !tx.is_closed()).count()
    }

    /// Sends an event to every subscriber, dropping the ones that hung up.
    pub fn emit(&mut self, event: ValueEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Attaches the outbound wire. Returns false, leaving the existing wire in
    /// place, if one is already attached.
    pub fn wire(&mut self, sink: Box<dyn PatchSink>) -> bool {
        if self.sink.is_some() {
            warn!("outbound wire already attached; ignoring second attachment");
            return false;
        }
        self.sink = Some(sink);
        true
    }

    /// Whether an outbound wire is attached.
    pub fn is_wired(&self) -> bool {
        self.sink.is_some()
    }

    /// Emits a patch event and hands the patch to the outbound wire.
    pub fn send_patch(&mut self, patch: String) -> ClientResult<()> {
        if let Some(sink) = &self.sink {
            sink.deliver(&patch)?;
        }
        self.emit(ValueEvent::Patch(patch));
        Ok(())
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("subscribers", &self.subscribers.len())
            .field("wired", &self.is_wired())
            .finish()
    }
}
