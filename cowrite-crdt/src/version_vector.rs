//! Version vector for register provenance.
//!
//! Maps each agent to the sequence number of the last patch it authored
//! that the holder has seen. The authority stamps every register write with
//! its current vector; clients carry it along so callers can reason about
//! causality between two register states.
//!
//! On the wire a version vector is a JSON object keyed by decimal agent id,
//! e.g. `{"17": 4, "23": 1}`.

use cowrite_types::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Causality relationship between two version vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CausalOrder {
    /// First vector happened before second.
    Before,
    /// First vector happened after second.
    After,
    /// Neither happened before the other.
    Concurrent,
    /// Vectors are identical.
    Equal,
}

/// Per-agent sequence numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionVector {
    seqs: BTreeMap<AgentId, u32>,
}

impl VersionVector {
    /// Creates a new empty version vector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sequence number for an agent, if present.
    #[must_use]
    pub fn get(&self, agent_id: AgentId) -> Option<u32> {
        self.seqs.get(&agent_id).copied()
    }

    /// Stores the sequence number for an agent.
    pub fn put(&mut self, agent_id: AgentId, seq: u32) {
        self.seqs.insert(agent_id, seq);
    }

    /// Returns all agents and their sequence numbers, ordered by agent.
    pub fn agents(&self) -> impl Iterator<Item = (AgentId, u32)> + '_ {
        self.seqs.iter().map(|(agent, seq)| (*agent, *seq))
    }

    /// Returns the number of agents in the vector.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seqs.len()
    }

    /// Returns true if the vector has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }

    /// Returns true iff `self[x] <= other[x]` for every agent `x` in `self`.
    #[must_use]
    pub fn leq(&self, other: &Self) -> bool {
        self.seqs
            .iter()
            .all(|(agent, seq)| other.get(*agent).is_some_and(|o| *seq <= o))
    }

    /// Compares this vector with another to determine causal ordering.
    #[must_use]
    pub fn compare(&self, other: &Self) -> CausalOrder {
        match (self.leq(other), other.leq(self)) {
            (true, true) => CausalOrder::Equal,
            (true, false) => CausalOrder::Before,
            (false, true) => CausalOrder::After,
            (false, false) => CausalOrder::Concurrent,
        }
    }

    /// Returns true if this vector is causally before the other.
    #[must_use]
    pub fn is_before(&self, other: &Self) -> bool {
        self.compare(other) == CausalOrder::Before
    }

    /// Returns true if this vector is causally after the other.
    #[must_use]
    pub fn is_after(&self, other: &Self) -> bool {
        self.compare(other) == CausalOrder::After
    }

    /// Returns true if neither vector dominates the other.
    #[must_use]
    pub fn is_concurrent(&self, other: &Self) -> bool {
        self.compare(other) == CausalOrder::Concurrent
    }
}

impl FromIterator<(AgentId, u32)> for VersionVector {
    fn from_iter<I: IntoIterator<Item = (AgentId, u32)>>(iter: I) -> Self {
        Self {
            seqs: iter.into_iter().collect(),
        }
    }
}
