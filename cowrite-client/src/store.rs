//! Replicated key-value store.
//!
//! The store multiplexes every replicated value over one subscription
//! stream. It is a pure state machine driven from outside: the owner of the
//! connection feeds [`TransportEvent`]s into [`Store::handle_event`] one at
//! a time, and the store answers through the injected [`Transport`].
//!
//! Lifecycle:
//! 1. `Opened`: send `SubscribeC2S`
//! 2. `ValueS2C`*: buffer snapshot entries
//! 3. `ValuesDoneS2C`: install and wire the snapshot, run the ready callback
//! 4. `PatchS2C`*: apply to the named value, creating it if unknown

use std::collections::HashMap;
use std::sync::Arc;

use cowrite_types::{AgentId, DType};
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};
use crate::event::PatchSink;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::registry::{decode_value, new_zero_value, parse_dtype};
use crate::transport::{Transport, TransportEvent};
use crate::value::{Register, TextValue, Value};

/// Configuration for the store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Label attached to log output.
    pub name: String,
    /// Reject patches that arrive before the snapshot is complete.
    pub strict_snapshot: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "cowrite".to_string(),
            strict_snapshot: true,
        }
    }
}

type ReadyCallback = Box<dyn FnOnce(&mut Store) + Send>;

/// Forwards one value's local patches to the authority.
struct OutboundPatches {
    key: String,
    dtype: DType,
    transport: Arc<dyn Transport>,
}

impl PatchSink for OutboundPatches {
    fn deliver(&self, patch: &str) -> ClientResult<()> {
        debug!(key = %self.key, dtype = %self.dtype, "sending patch");
        self.transport.send(ClientMessage::PatchC2S {
            key: self.key.clone(),
            dtype: self.dtype.to_string(),
            patch: patch.to_string(),
        })
    }
}

/// The client's replica of every value it is subscribed to.
pub struct Store {
    config: StoreConfig,
    transport: Arc<dyn Transport>,
    values: HashMap<String, Value>,
    /// Snapshot entries received before `ValuesDoneS2C`.
    snapshot: HashMap<String, Value>,
    subscribed: bool,
    ready: bool,
    closed: bool,
    agent_id: Option<AgentId>,
    client_id: Option<u32>,
    on_ready: Option<ReadyCallback>,
}

impl Store {
    /// Creates a store with the default configuration.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_config(transport, StoreConfig::default())
    }

    /// Creates a store with a custom configuration.
    pub fn with_config(transport: Arc<dyn Transport>, config: StoreConfig) -> Self {
        Self {
            config,
            transport,
            values: HashMap::new(),
            snapshot: HashMap::new(),
            subscribed: false,
            ready: false,
            closed: false,
            agent_id: None,
            client_id: None,
            on_ready: None,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Registers the callback run once the initial snapshot is installed.
    ///
    /// Runs immediately if the store is already ready.
    pub fn open(&mut self, on_ready: impl FnOnce(&mut Store) + Send + 'static) {
        if self.ready {
            on_ready(self);
        } else {
            self.on_ready = Some(Box::new(on_ready));
        }
    }

    /// Whether the initial snapshot has been installed.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether the transport reported the connection closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Agent id assigned by the authority, once subscribed.
    pub fn agent_id(&self) -> Option<AgentId> {
        self.agent_id
    }

    /// Client id assigned by the authority, once subscribed.
    pub fn client_id(&self) -> Option<u32> {
        self.client_id
    }

    // ── Inbound ──────────────────────────────────────────────────

    /// Handles one event from the transport.
    pub fn handle_event(&mut self, event: TransportEvent) -> ClientResult<()> {
        match event {
            TransportEvent::Opened => self.handle_opened(),
            TransportEvent::Received(message) => self.handle_message(message),
            TransportEvent::Closed => {
                info!(store = %self.config.name, "transport closed");
                self.closed = true;
                Ok(())
            }
        }
    }

    fn handle_opened(&mut self) -> ClientResult<()> {
        if self.subscribed {
            warn!(store = %self.config.name, "transport opened twice; not resubscribing");
            return Ok(());
        }
        self.transport.send(ClientMessage::SubscribeC2S)?;
        self.subscribed = true;
        debug!(store = %self.config.name, "subscribed");
        Ok(())
    }

    /// Handles one message from the authority.
    pub fn handle_message(&mut self, message: ServerMessage) -> ClientResult<()> {
        match message {
            ServerMessage::SubscribeResponseS2C {
                agent_id,
                client_id,
            } => {
                debug!(store = %self.config.name, %agent_id, client_id, "subscription ids assigned");
                self.agent_id = Some(agent_id);
                self.client_id = Some(client_id);
                Ok(())
            }
            ServerMessage::ValueS2C { key, dtype, value } => {
                self.handle_snapshot_value(key, &dtype, &value)
            }
            ServerMessage::ValuesDoneS2C => self.handle_values_done(),
            ServerMessage::PatchS2C {
                agent_id,
                is_local,
                key,
                dtype,
                patch,
            } => self.handle_patch(key, &dtype, agent_id, is_local, &patch),
        }
    }

    fn handle_snapshot_value(&mut self, key: String, dtype: &str, value: &str) -> ClientResult<()> {
        if self.ready {
            return Err(ClientError::Protocol(format!(
                "snapshot value for {key} after snapshot end"
            )));
        }
        let value = decode_value(parse_dtype(dtype)?, value)?;
        self.snapshot.insert(key, value);
        Ok(())
    }

    fn handle_values_done(&mut self) -> ClientResult<()> {
        if self.ready {
            return Err(ClientError::Protocol("duplicate snapshot end".into()));
        }
        let count = self.snapshot.len();
        for (key, value) in std::mem::take(&mut self.snapshot) {
            if self.values.contains_key(&key) {
                warn!(store = %self.config.name, %key, "snapshot replaces locally created value");
            }
            self.install(key, value);
        }
        self.ready = true;
        info!(store = %self.config.name, values = count, "snapshot installed");
        if let Some(on_ready) = self.on_ready.take() {
            on_ready(self);
        }
        Ok(())
    }

    fn handle_patch(
        &mut self,
        key: String,
        dtype: &str,
        origin: Option<AgentId>,
        is_local: bool,
        patch: &str,
    ) -> ClientResult<()> {
        let dtype = parse_dtype(dtype)?;
        debug!(
            store = %self.config.name,
            %key,
            %dtype,
            origin = ?origin.map(|a| a.get()),
            is_local,
            "patch received"
        );
        if dtype.is_tombstone() {
            return Err(ClientError::Unimplemented("delete patches"));
        }

        if !self.ready {
            if self.config.strict_snapshot {
                return Err(ClientError::Protocol(format!(
                    "patch for {key} before snapshot end"
                )));
            }
            if let Some(value) = self.snapshot.get_mut(&key) {
                check_dtype(&key, value, dtype)?;
                return value.apply_patch(is_local, patch);
            }
            let value = born_from_patch(dtype, is_local, patch)?;
            self.snapshot.insert(key, value);
            return Ok(());
        }

        if let Some(value) = self.values.get_mut(&key) {
            check_dtype(&key, value, dtype)?;
            return value.apply_patch(is_local, patch);
        }
        let value = born_from_patch(dtype, is_local, patch)?;
        info!(store = %self.config.name, %key, %dtype, "value created by remote patch");
        self.install(key, value);
        Ok(())
    }

    /// Adds a value to the live map with its outbound wire attached.
    fn install(&mut self, key: String, mut value: Value) {
        if !value.is_wired() {
            value.wire(Box::new(OutboundPatches {
                key: key.clone(),
                dtype: value.dtype(),
                transport: Arc::clone(&self.transport),
            }));
        }
        self.values.insert(key, value);
    }

    // ── Access ───────────────────────────────────────────────────

    /// Returns the value under `key`, optionally checking its dtype.
    pub fn get(&self, key: &str, dtype: Option<DType>) -> ClientResult<&Value> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| ClientError::NotFound(key.to_string()))?;
        if let Some(dtype) = dtype {
            check_dtype(key, value, dtype)?;
        }
        Ok(value)
    }

    /// Returns the value under `key` mutably, optionally checking its dtype.
    pub fn get_mut(&mut self, key: &str, dtype: Option<DType>) -> ClientResult<&mut Value> {
        let value = self
            .values
            .get_mut(key)
            .ok_or_else(|| ClientError::NotFound(key.to_string()))?;
        if let Some(dtype) = dtype {
            check_dtype(key, value, dtype)?;
        }
        Ok(value)
    }

    /// Returns the value under `key`, creating an empty one of `dtype` if
    /// there is none. An existing value must have the same dtype.
    pub fn get_or_create(&mut self, key: &str, dtype: DType) -> ClientResult<&mut Value> {
        if !self.values.contains_key(key) {
            let value = new_zero_value(dtype)?;
            debug!(store = %self.config.name, %key, %dtype, "value created locally");
            self.install(key.to_string(), value);
        }
        self.get_mut(key, Some(dtype))
    }

    /// Returns the text value under `key`.
    pub fn text_mut(&mut self, key: &str) -> ClientResult<&mut TextValue> {
        match self.get_mut(key, Some(DType::CString))? {
            Value::Text(text) => Ok(text),
            Value::Register(_) => Err(mismatch(key, DType::CString, DType::CRegister)),
        }
    }

    /// Returns the register under `key`.
    pub fn register_mut(&mut self, key: &str) -> ClientResult<&mut Register> {
        match self.get_mut(key, Some(DType::CRegister))? {
            Value::Register(register) => Ok(register),
            Value::Text(_) => Err(mismatch(key, DType::CRegister, DType::CString)),
        }
    }

    /// Requests that the register under `key` hold `value`, creating the
    /// register if needed.
    pub fn put(&mut self, key: &str, value: serde_json::Value) -> ClientResult<()> {
        self.get_or_create(key, DType::CRegister)?;
        self.register_mut(key)?.set(value)
    }

    /// Deleting keys is not supported.
    pub fn del(&mut self, key: &str) -> ClientResult<()> {
        debug!(store = %self.config.name, %key, "delete requested");
        Err(ClientError::Unimplemented("del"))
    }

    /// Iterates over the live keys, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no live values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A zero value with `patch` applied. Nothing is kept if the patch fails.
fn born_from_patch(dtype: DType, is_local: bool, patch: &str) -> ClientResult<Value> {
    let mut value = new_zero_value(dtype)?;
    value.apply_patch(is_local, patch)?;
    Ok(value)
}

fn check_dtype(key: &str, value: &Value, expected: DType) -> ClientResult<()> {
    let actual = value.dtype();
    if actual != expected {
        return Err(mismatch(key, expected, actual));
    }
    Ok(())
}

fn mismatch(key: &str, expected: DType, actual: DType) -> ClientError {
    ClientError::DTypeMismatch {
        key: key.to_string(),
        expected,
        actual,
    }
}
