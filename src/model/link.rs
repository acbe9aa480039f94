//! Trail segment (`link`) between two nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Code, LinkStatus, Networks, NodeId, Position};

/// Arena index of a link inside a [`Topology`](crate::topology::Topology).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkId(pub usize);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Orientation of a link as seen from one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// The endpoint is the link's lower code.
    Outgoing,
    /// The endpoint is the link's higher code.
    Incoming,
}

impl Direction {
    pub fn arrow(self) -> char {
        match self {
            Direction::Outgoing => '>',
            Direction::Incoming => '<',
        }
    }
}

/// Canonical undirected key: the two endpoint codes, lower first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkKey {
    pub low: Code,
    pub high: Code,
}

impl LinkKey {
    /// `None` for a degenerate key (both ends equal).
    pub fn new(a: Code, b: Code) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

/// Persistent link id built from two legacy node ids, ordered as text.
pub fn pid_for(a: u64, b: u64) -> String {
    let (a, b) = (a.to_string(), b.to_string());
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{lo}-{hi}")
}

/// A link between two known nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub key: LinkKey,
    /// Persistent id, empty for brand-new links.
    pub pid: String,
    pub status: LinkStatus,
    /// Node holding `key.low`.
    pub start: NodeId,
    /// Node holding `key.high`.
    pub end: NodeId,
    pub centroid: Position,
    pub networks: Networks,
    /// True once both endpoints list this link in their adjacency.
    pub linked: bool,
    pub line: usize,
}

impl Link {
    /// The endpoint opposite `from`.
    pub fn other_node(&self, from: NodeId) -> Option<NodeId> {
        if from == self.start {
            Some(self.end)
        } else if from == self.end {
            Some(self.start)
        } else {
            None
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'{{{}}}[{}]", self.key, self.pid, self.status)
    }
}
