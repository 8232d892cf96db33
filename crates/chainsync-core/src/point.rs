//! Chain positions and tips.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the symbolic point at the start of the chain.
pub const ORIGIN: &str = "origin";

/// Slot, header hash and (when known) block height of a block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointStruct {
    pub slot: u64,
    /// BLAKE2b-256 header hash.
    pub id: String,
    /// Not part of roll-backward notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_no: Option<u64>,
}

impl PointStruct {
    pub fn new(slot: u64, id: impl Into<String>) -> Self {
        Self {
            slot,
            id: id.into(),
            block_no: None,
        }
    }

    pub fn with_block_no(mut self, block_no: u64) -> Self {
        self.block_no = Some(block_no);
        self
    }
}

/// A position on the chain.
///
/// In JSON a bare string is a symbolic point and an object is a structured
/// point; see [`crate::codec`] for the binary and attribute encodings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Point {
    Symbolic(String),
    Structured(PointStruct),
}

impl Point {
    pub fn origin() -> Self {
        Self::Symbolic(ORIGIN.to_string())
    }

    pub fn is_origin(&self) -> bool {
        matches!(self, Self::Symbolic(s) if s == ORIGIN)
    }

    pub fn as_struct(&self) -> Option<&PointStruct> {
        match self {
            Self::Structured(p) => Some(p),
            Self::Symbolic(_) => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Self::Symbolic(s) => Some(s),
            Self::Structured(_) => None,
        }
    }

    pub fn slot(&self) -> Option<u64> {
        self.as_struct().map(|p| p.slot)
    }
}

impl From<PointStruct> for Point {
    fn from(p: PointStruct) -> Self {
        Self::Structured(p)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symbolic(s) => f.write_str(s),
            Self::Structured(p) => match p.block_no {
                Some(block) => write!(f, "slot={} id={} block={block}", p.slot, p.id),
                None => write!(f, "slot={} id={}", p.slot, p.id),
            },
        }
    }
}

/// Most recent first: structured points by descending slot, then every
/// symbolic point, symbols in descending order.
impl Ord for Point {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Structured(a), Self::Structured(b)) => b
                .slot
                .cmp(&a.slot)
                .then_with(|| a.id.cmp(&b.id))
                .then_with(|| a.block_no.cmp(&b.block_no)),
            (Self::Structured(_), Self::Symbolic(_)) => Ordering::Less,
            (Self::Symbolic(_), Self::Structured(_)) => Ordering::Greater,
            (Self::Symbolic(a), Self::Symbolic(b)) => b.cmp(a),
        }
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A list of points, displayed comma-separated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Points(pub Vec<Point>);

impl Points {
    /// Sort most recent first.
    pub fn sorted(mut self) -> Self {
        self.0.sort();
        self
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, p) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{p}")?;
        }
        Ok(())
    }
}

/// Snapshot of the remote node's chain head.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tip {
    #[serde(default)]
    pub slot: u64,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub height: u64,
}

impl Tip {
    pub fn new(slot: u64, id: impl Into<String>, height: u64) -> Self {
        Self {
            slot,
            id: id.into(),
            height,
        }
    }

    /// The tip as a structured point.
    pub fn point(&self) -> Point {
        Point::Structured(PointStruct::new(self.slot, self.id.clone()).with_block_no(self.height))
    }
}

impl fmt::Display for Tip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot={} id={} height={}", self.slot, self.id, self.height)
    }
}
