//! Position identifiers.
//!
//! A [`Pid`] names the place of one atom in a sequence independently of its
//! array index. Pids form a dense total order: the allocation authority can
//! always mint a new Pid strictly between two existing ones by extending the
//! id path. This module only orders and encodes whatever Pids it is given.
//!
//! Based on "Logoot: A Scalable Optimistic Replication Algorithm for
//! Collaborative Editing on P2P Networks" (Weiss, Urso, Molli).

use cowrite_types::AgentId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{ParseError, ParseResult};

/// One step of a position path: a position chosen by an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id {
    /// Position within the gap between the neighbouring ids.
    pub position: u32,
    /// Agent that picked the position.
    pub agent_id: AgentId,
}

impl Id {
    /// Creates a new id.
    #[must_use]
    pub fn new(position: u32, agent_id: u32) -> Self {
        Self {
            position,
            agent_id: AgentId::new(agent_id),
        }
    }
}

impl PartialOrd for Id {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Id {
    fn cmp(&self, other: &Self) -> Ordering {
        self.position
            .cmp(&other.position)
            .then_with(|| self.agent_id.cmp(&other.agent_id))
    }
}

/// A position identifier: a non-empty id path plus the minting agent's
/// logical clock.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pid {
    ids: Vec<Id>,
    seq: u32,
}

impl Pid {
    /// Creates a Pid from an id path and sequence number.
    ///
    /// Returns `None` for an empty path, which has no string encoding.
    #[must_use]
    pub fn new(ids: Vec<Id>, seq: u32) -> Option<Self> {
        if ids.is_empty() {
            None
        } else {
            Some(Self { ids, seq })
        }
    }

    /// Creates a single-level Pid.
    #[must_use]
    pub fn single(position: u32, agent_id: u32, seq: u32) -> Self {
        Self {
            ids: vec![Id::new(position, agent_id)],
            seq,
        }
    }

    /// Returns a Pid one level deeper than this one. It sorts after `self`
    /// and before every Pid that is greater than `self` at an earlier level.
    #[must_use]
    pub fn child(&self, position: u32, agent_id: u32, seq: u32) -> Self {
        let mut ids = self.ids.clone();
        ids.push(Id::new(position, agent_id));
        Self { ids, seq }
    }

    /// The id path.
    #[must_use]
    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    /// The logical clock value of the agent that minted this Pid.
    #[must_use]
    pub fn seq(&self) -> u32 {
        self.seq
    }

    /// Encodes this Pid as `pos.agent:pos.agent~seq`.
    #[must_use]
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Decodes a Pid from its string form.
    pub fn decode(s: &str) -> ParseResult<Self> {
        s.parse()
    }
}

impl PartialOrd for Pid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pid {
    fn cmp(&self, other: &Self) -> Ordering {
        // Lexicographic over the path; a strict prefix sorts first.
        for (a, b) in self.ids.iter().zip(&other.ids) {
            match a.cmp(b) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        match self.ids.len().cmp(&other.ids.len()) {
            Ordering::Equal => self.seq.cmp(&other.seq),
            ord => ord,
        }
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.ids.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{}.{}", id.position, id.agent_id)?;
        }
        write!(f, "~{}", self.seq)
    }
}

impl FromStr for Pid {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidPid(s.to_string());

        let (path, seq) = s.split_once('~').ok_or_else(invalid)?;
        if seq.contains('~') {
            return Err(invalid());
        }
        let seq = parse_number(seq).ok_or_else(invalid)?;

        let ids = path
            .split(':')
            .map(|segment| {
                let (position, agent) = segment.split_once('.').ok_or_else(invalid)?;
                let position = parse_number(position).ok_or_else(invalid)?;
                let agent = parse_number(agent).ok_or_else(invalid)?;
                Ok(Id::new(position, agent))
            })
            .collect::<ParseResult<Vec<_>>>()?;

        Self::new(ids, seq).ok_or_else(invalid)
    }
}

/// Parses a plain decimal number. Signs are rejected so that decoding stays
/// the exact inverse of encoding.
fn parse_number(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl Serialize for Pid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
