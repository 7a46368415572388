//! Wire messages exchanged with the relay authority.
//!
//! The protocol is a single subscription stream:
//! 1. On connect the client sends `SubscribeC2S`
//! 2. The authority answers with its ids, then one `ValueS2C` per stored key
//!    and a closing `ValuesDoneS2C`
//! 3. From then on every accepted patch, local or remote, is rebroadcast as
//!    `PatchS2C` in the authority's global order
//!
//! Local edits travel upstream as `PatchC2S` and only take effect when their
//! echo comes back down as a `PatchS2C` with `IsLocal` set.
//!
//! Each frame is one JSON object tagged by its `"Type"` field, with
//! PascalCase field names.

use cowrite_types::AgentId;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// A message from the authority to this client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type", rename_all_fields = "PascalCase")]
pub enum ServerMessage {
    /// Ids assigned to this subscription.
    SubscribeResponseS2C { agent_id: AgentId, client_id: u32 },

    /// One entry of the initial snapshot.
    ValueS2C {
        key: String,
        #[serde(rename = "DType")]
        dtype: String,
        value: String,
    },

    /// End of the initial snapshot.
    ValuesDoneS2C,

    /// A patch accepted by the authority.
    PatchS2C {
        #[serde(default)]
        agent_id: Option<AgentId>,
        #[serde(default)]
        is_local: bool,
        key: String,
        #[serde(rename = "DType")]
        dtype: String,
        patch: String,
    },
}

impl ServerMessage {
    /// Message type tags this client understands.
    pub const TYPES: [&'static str; 4] = [
        "SubscribeResponseS2C",
        "ValueS2C",
        "ValuesDoneS2C",
        "PatchS2C",
    ];

    /// Decodes one frame.
    ///
    /// Unknown or missing `Type` tags and malformed known messages are
    /// protocol errors; a frame that is not JSON at all is a serialization
    /// error.
    pub fn decode(frame: &str) -> ClientResult<Self> {
        decode_tagged(frame, &Self::TYPES)
    }

    /// Encodes this message as one frame.
    pub fn encode(&self) -> ClientResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A message from this client to the authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type", rename_all_fields = "PascalCase")]
pub enum ClientMessage {
    /// Opens the subscription stream.
    SubscribeC2S,

    /// A local edit to one value.
    PatchC2S {
        key: String,
        #[serde(rename = "DType")]
        dtype: String,
        patch: String,
    },
}

impl ClientMessage {
    /// Message type tags a client may send.
    pub const TYPES: [&'static str; 2] = ["SubscribeC2S", "PatchC2S"];

    /// Decodes one frame.
    pub fn decode(frame: &str) -> ClientResult<Self> {
        decode_tagged(frame, &Self::TYPES)
    }

    /// Encodes this message as one frame.
    pub fn encode(&self) -> ClientResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn decode_tagged<T: serde::de::DeserializeOwned>(frame: &str, known: &[&str]) -> ClientResult<T> {
    let raw: serde_json::Value = serde_json::from_str(frame)?;
    let kind = raw
        .get("Type")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| ClientError::Protocol("message has no type".into()))?;
    if !known.contains(&kind) {
        return Err(ClientError::Protocol(format!("unknown message type: {kind}")));
    }
    let kind = kind.to_string();
    serde_json::from_value(raw)
        .map_err(|e| ClientError::Protocol(format!("malformed {kind}: {e}")))
}
