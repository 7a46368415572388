//! Sequence operations and the patch codec.
//!
//! Clients never mint Pids. A local insertion travels as a
//! [`Op::ClientInsert`] that only names its neighbours; the allocation
//! authority picks globally unique Pids for each character and rebroadcasts
//! canonical [`Op::Insert`]s to every subscriber, the originator included.
//!
//! Wire forms:
//!
//! ```text
//! ci,<prevPid|''>,<nextPid|''>,<value>
//! i,<pid>,<value>
//! d,<pid>
//! ```
//!
//! A patch is a JSON array of such strings.

use std::fmt;
use std::str::FromStr;

use crate::error::{ParseError, ParseResult};
use crate::pid::Pid;

/// A single sequence operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Request to insert `value` between two atoms. `None` means the start
    /// (for `prev_pid`) or end (for `next_pid`) of the sequence.
    ClientInsert {
        prev_pid: Option<Pid>,
        next_pid: Option<Pid>,
        value: String,
    },
    /// Authoritative insertion of one atom at its final Pid.
    Insert { pid: Pid, value: char },
    /// Removal of the atom with the given Pid.
    Delete { pid: Pid },
}

impl Op {
    /// Returns true for operations only a client may send.
    #[must_use]
    pub fn is_client_only(&self) -> bool {
        matches!(self, Op::ClientInsert { .. })
    }

    /// Encodes this operation.
    #[must_use]
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Decodes an operation from its string form.
    pub fn decode(s: &str) -> ParseResult<Self> {
        s.parse()
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::ClientInsert {
                prev_pid,
                next_pid,
                value,
            } => {
                f.write_str("ci,")?;
                if let Some(pid) = prev_pid {
                    write!(f, "{pid}")?;
                }
                f.write_str(",")?;
                if let Some(pid) = next_pid {
                    write!(f, "{pid}")?;
                }
                write!(f, ",{value}")
            }
            Op::Insert { pid, value } => write!(f, "i,{pid},{value}"),
            Op::Delete { pid } => write!(f, "d,{pid}"),
        }
    }
}

impl FromStr for Op {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidOp(s.to_string());
        let tag = s.split(',').next().unwrap_or_default();

        match tag {
            "ci" => {
                let parts: Vec<&str> = s.splitn(4, ',').collect();
                if parts.len() < 4 {
                    return Err(invalid());
                }
                let prev_pid = optional_pid(parts[1]).map_err(|_| invalid())?;
                let next_pid = optional_pid(parts[2]).map_err(|_| invalid())?;
                Ok(Op::ClientInsert {
                    prev_pid,
                    next_pid,
                    value: parts[3].to_string(),
                })
            }
            "i" => {
                let parts: Vec<&str> = s.splitn(3, ',').collect();
                if parts.len() < 3 {
                    return Err(invalid());
                }
                let pid = parts[1].parse().map_err(|_| invalid())?;
                let mut chars = parts[2].chars();
                match (chars.next(), chars.next()) {
                    (Some(value), None) => Ok(Op::Insert { pid, value }),
                    _ => Err(invalid()),
                }
            }
            "d" => {
                let parts: Vec<&str> = s.splitn(2, ',').collect();
                if parts.len() < 2 {
                    return Err(invalid());
                }
                let pid = parts[1].parse().map_err(|_| invalid())?;
                Ok(Op::Delete { pid })
            }
            other => Err(ParseError::UnknownOpType(other.to_string())),
        }
    }
}

fn optional_pid(s: &str) -> ParseResult<Option<Pid>> {
    if s.is_empty() {
        Ok(None)
    } else {
        s.parse().map(Some)
    }
}

/// Encodes a list of operations as a patch (a JSON array of op strings).
#[must_use]
pub fn encode_patch(ops: &[Op]) -> String {
    let strs: Vec<String> = ops.iter().map(Op::encode).collect();
    // A Vec<String> always serializes.
    serde_json::Value::from(strs).to_string()
}

/// Decodes a patch into its operations.
pub fn decode_patch(patch: &str) -> ParseResult<Vec<Op>> {
    let strs: Vec<String> = serde_json::from_str(patch)?;
    strs.iter().map(|s| s.parse()).collect()
}
