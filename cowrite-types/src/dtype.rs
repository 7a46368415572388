//! Data type tags for replicated values.
//!
//! The tag travels next to every value and patch on the wire so that the
//! receiving side knows how to decode it.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// The kind of a replicated value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// Last-one-wins register holding a JSON scalar or document.
    CRegister,
    /// Collaborative string backed by a position-identifier sequence.
    CString,
    /// Reserved tombstone tag. Record deletion is not implemented.
    Delete,
}

impl DType {
    /// All tags, in wire order.
    pub const ALL: [DType; 3] = [DType::CRegister, DType::CString, DType::Delete];

    /// Returns the wire tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DType::CRegister => "cregister",
            DType::CString => "cstring",
            DType::Delete => "delete",
        }
    }

    /// Returns true for the reserved tombstone tag.
    #[must_use]
    pub const fn is_tombstone(&self) -> bool {
        matches!(self, DType::Delete)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cregister" => Ok(DType::CRegister),
            "cstring" => Ok(DType::CString),
            "delete" => Ok(DType::Delete),
            other => Err(Error::UnknownDType(other.to_string())),
        }
    }
}

impl Serialize for DType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
