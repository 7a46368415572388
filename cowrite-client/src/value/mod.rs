//! Replicated values.
//!
//! Every value follows the same optimistic-concurrency contract:
//!
//! - a local mutation never touches derived state; it only emits a patch
//!   describing the intent and takes the value's single edit token;
//! - while the token is held, further local mutations fail with
//!   [`ClientError::Paused`](crate::ClientError::Paused);
//! - every change, local or remote, is realized by [`Value::apply_patch`] in
//!   transport delivery order, and the echo of our own patch
//!   (`is_local = true`) gives the token back.
//!
//! At most one unacknowledged local mutation exists per value at any time.

mod compact;
mod register;
mod text;

pub use compact::{Compactor, Replace};
pub use register::{Register, RegisterSnapshot};
pub use text::TextValue;

use cowrite_types::DType;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::event::{Emitter, PatchSink, ValueEvent};

/// Proof that a local edit is awaiting its echo.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EditToken {
    patch: String,
}

/// State shared by every value kind: the edit token and the event channel.
#[derive(Debug, Default)]
pub(crate) struct ValueCore {
    in_flight: Option<EditToken>,
    events: Emitter,
}

impl ValueCore {
    pub(crate) fn in_flight_edit(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Fails with `Paused` while a local edit is outstanding.
    pub(crate) fn ensure_idle(&self) -> ClientResult<()> {
        if self.in_flight.is_some() {
            return Err(ClientError::Paused);
        }
        Ok(())
    }

    /// Takes the edit token and sends the patch out.
    ///
    /// If the patch cannot be handed to the transport the token is returned
    /// immediately: no echo will ever arrive for it.
    pub(crate) fn begin_edit(&mut self, patch: String) -> ClientResult<()> {
        self.ensure_idle()?;
        self.in_flight = Some(EditToken {
            patch: patch.clone(),
        });
        if let Err(e) = self.events.send_patch(patch) {
            self.in_flight = None;
            return Err(e);
        }
        Ok(())
    }

    /// Releases the edit token on the echo of our own patch.
    pub(crate) fn acknowledge(&mut self) {
        if let Some(token) = self.in_flight.take() {
            debug!(patch = %token.patch, "local edit acknowledged");
        }
    }

    pub(crate) fn emit(&mut self, event: ValueEvent) {
        self.events.emit(event);
    }

    pub(crate) fn is_wired(&self) -> bool {
        self.events.is_wired()
    }

    pub(crate) fn events_mut(&mut self) -> &mut Emitter {
        &mut self.events
    }
}

/// A replicated value of any supported dtype.
#[derive(Debug)]
pub enum Value {
    Register(Register),
    Text(TextValue),
}

impl Value {
    /// Returns this value's dtype.
    #[must_use]
    pub fn dtype(&self) -> DType {
        match self {
            Value::Register(_) => DType::CRegister,
            Value::Text(_) => DType::CString,
        }
    }

    /// Applies an encoded patch from the authority.
    ///
    /// `is_local` marks the echo of this client's own patch, which releases
    /// the edit token.
    pub fn apply_patch(&mut self, is_local: bool, patch: &str) -> ClientResult<()> {
        match self {
            Value::Register(register) => register.apply_patch(is_local, patch),
            Value::Text(text) => text.apply_patch(is_local, patch),
        }
    }

    /// Returns true while a local mutation awaits its echo.
    #[must_use]
    pub fn in_flight_edit(&self) -> bool {
        self.core().in_flight_edit()
    }

    /// Opens a new event stream for this value.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ValueEvent> {
        self.core_mut().events_mut().subscribe()
    }

    /// Encodes the full value in its snapshot form.
    pub fn encode(&self) -> ClientResult<String> {
        match self {
            Value::Register(register) => register.encode(),
            Value::Text(text) => text.encode(),
        }
    }

    /// Returns the text value, if this is one.
    #[must_use]
    pub fn as_text(&self) -> Option<&TextValue> {
        match self {
            Value::Text(text) => Some(text),
            Value::Register(_) => None,
        }
    }

    /// Returns the text value mutably, if this is one.
    pub fn as_text_mut(&mut self) -> Option<&mut TextValue> {
        match self {
            Value::Text(text) => Some(text),
            Value::Register(_) => None,
        }
    }

    /// Returns the register, if this is one.
    #[must_use]
    pub fn as_register(&self) -> Option<&Register> {
        match self {
            Value::Register(register) => Some(register),
            Value::Text(_) => None,
        }
    }

    /// Returns the register mutably, if this is one.
    pub fn as_register_mut(&mut self) -> Option<&mut Register> {
        match self {
            Value::Register(register) => Some(register),
            Value::Text(_) => None,
        }
    }

    /// Attaches the outbound wire. See [`Emitter::wire`].
    pub fn wire(&mut self, sink: Box<dyn PatchSink>) -> bool {
        self.core_mut().events_mut().wire(sink)
    }

    /// Whether an outbound wire is attached.
    #[must_use]
    pub fn is_wired(&self) -> bool {
        self.core().is_wired()
    }

    fn core(&self) -> &ValueCore {
        match self {
            Value::Register(register) => &register.core,
            Value::Text(text) => &text.core,
        }
    }

    fn core_mut(&mut self) -> &mut ValueCore {
        match self {
            Value::Register(register) => &mut register.core,
            Value::Text(text) => &mut text.core,
        }
    }
}

impl From<Register> for Value {
    fn from(register: Register) -> Self {
        Value::Register(register)
    }
}

impl From<TextValue> for Value {
    fn from(text: TextValue) -> Self {
        Value::Text(text)
    }
}
