//! Last-writer-wins register.
//!
//! The authority stamps every accepted write with the writer's agent id,
//! its current version vector and a wall-clock time, and rebroadcasts the
//! stamped record. Clients never merge: every rebroadcast record replaces
//! the local one wholesale, so replicas agree once they have seen the same
//! patch stream.

use chrono::{DateTime, Utc};
use cowrite_crdt::{ParseError, VersionVector};
use cowrite_types::AgentId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ValueCore;
use crate::error::ClientResult;
use crate::event::{ValueEvent, ValueSet};

/// A stamped register record, as carried in snapshots and server patches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RegisterSnapshot {
    pub agent_id: AgentId,
    pub vec: Option<VersionVector>,
    pub time: Option<DateTime<Utc>>,
    pub val: serde_json::Value,
}

impl RegisterSnapshot {
    /// Decodes a JSON record.
    pub fn decode(s: &str) -> ClientResult<Self> {
        serde_json::from_str(s).map_err(|e| ParseError::Json(e).into())
    }

    /// Encodes this record as JSON.
    pub fn encode(&self) -> ClientResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Whether `self` wins over `current` under last-writer-wins.
    ///
    /// A causally later vector wins; a causally earlier one loses. Between
    /// concurrent writes the later time wins, then the higher agent id.
    /// This is the authority's rule; clients only ever overwrite.
    #[must_use]
    pub fn supersedes(&self, current: &Self) -> bool {
        let empty = VersionVector::new();
        let ours = self.vec.as_ref().unwrap_or(&empty);
        let theirs = current.vec.as_ref().unwrap_or(&empty);
        if ours.is_after(theirs) {
            return true;
        }
        if ours.is_before(theirs) {
            return false;
        }
        match (self.time, current.time) {
            (Some(a), Some(b)) if a != b => a > b,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            _ => self.agent_id > current.agent_id,
        }
    }
}

/// A replicated scalar.
#[derive(Debug, Default)]
pub struct Register {
    state: RegisterSnapshot,
    pub(crate) core: ValueCore,
}

impl Register {
    /// Creates an empty register holding `null`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a snapshot value.
    pub fn decode(s: &str) -> ClientResult<Self> {
        Ok(Self {
            state: RegisterSnapshot::decode(s)?,
            core: ValueCore::default(),
        })
    }

    /// Encodes the full record.
    pub fn encode(&self) -> ClientResult<String> {
        self.state.encode()
    }

    /// Returns the current value.
    pub fn get(&self) -> &serde_json::Value {
        &self.state.val
    }

    /// Agent that wrote the current value.
    pub fn agent_id(&self) -> AgentId {
        self.state.agent_id
    }

    /// Version vector the current value was stamped with.
    pub fn version_vector(&self) -> Option<&VersionVector> {
        self.state.vec.as_ref()
    }

    /// Time the current value was stamped with.
    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.state.time
    }

    /// The full stamped record.
    pub fn snapshot(&self) -> &RegisterSnapshot {
        &self.state
    }

    /// Requests that the register hold `value`.
    ///
    /// Nothing changes locally until the authority's echo arrives.
    pub fn set(&mut self, value: serde_json::Value) -> ClientResult<()> {
        self.core.ensure_idle()?;
        let patch = serde_json::to_string(&value)?;
        self.core.begin_edit(patch)
    }

    /// Adopts a stamped record from the authority.
    pub fn apply_patch(&mut self, is_local: bool, patch: &str) -> ClientResult<()> {
        if is_local {
            self.core.acknowledge();
        }
        let other = RegisterSnapshot::decode(patch)?;
        debug!(agent_id = %other.agent_id, is_local, "register overwritten");
        let value = other.val.clone();
        self.state = other;
        self.core
            .emit(ValueEvent::ValueSet(ValueSet { is_local, value }));
        Ok(())
    }
}
