//! Identifier types used throughout the Cowrite core.
//!
//! Agent ids are small integers handed out by the allocation authority; the
//! same number appears inside position identifiers and register provenance.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Identifier of an agent (a relay authority or one of its devices).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates an agent ID from its raw number.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw number.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for AgentId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AgentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>()
            .map(Self)
            .map_err(|_| Error::InvalidAgentId(s.to_string()))
    }
}
