//! Way-marking node (`knoop`) in the network.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{Code, Direction, LatLon, LinkId, NodeStatus, Position};

/// Arena index of a node inside a [`Topology`](crate::topology::Topology).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Network memberships; most nodes sit in one or two networks.
pub type Networks = SmallVec<[String; 2]>;

/// Largest signage number.
pub const MAX_NUMBER: u8 = 99;

/// Outcome of allocation for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "number", rename_all = "snake_case")]
pub enum Assignment {
    /// Not yet visited by the allocator (or not participating).
    #[default]
    Pending,
    /// Pinned node without a legacy number; holds no number on purpose.
    Unnumbered,
    Assigned(u8),
    /// No candidate passed, not even in lenient mode.
    Failed,
}

impl Assignment {
    pub fn number(self) -> Option<u8> {
        match self {
            Assignment::Assigned(nr) => Some(nr),
            _ => None,
        }
    }
}

/// One neighbour in a node's adjacency map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjacent {
    pub link: LinkId,
    pub node: NodeId,
    pub direction: Direction,
}

/// A way-marking node.
///
/// Created once per code during the topology build; repeated sightings in
/// other networks only grow `networks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub code: Code,
    pub status: NodeStatus,
    /// Legacy persistent id, 0 when the node never existed.
    pub legacy_id: u64,
    /// Legacy signage number, 0 when unassigned.
    pub old_nr: u32,
    pub assignment: Assignment,
    pub position: Position,
    pub lat_lon: Option<LatLon>,
    pub networks: Networks,
    /// Neighbour code → link, ordered by code.
    pub adjacency: BTreeMap<Code, Adjacent>,
    /// Set when a DEL or NEW link touches this node.
    pub must_change: bool,
    /// Set when the row failed a consistency check that makes its links
    /// untrustworthy; such nodes never join adjacency maps.
    pub quarantined: bool,
    /// Set when the allocator refused to keep the legacy number.
    pub legacy_rejected: bool,
    /// Source line of the first sighting.
    pub line: usize,
}

impl Node {
    pub fn new(id: NodeId, code: Code, status: NodeStatus, position: Position) -> Self {
        Self {
            id,
            code,
            status,
            legacy_id: 0,
            old_nr: 0,
            assignment: Assignment::Pending,
            position,
            lat_lon: None,
            networks: Networks::new(),
            adjacency: BTreeMap::new(),
            must_change: false,
            quarantined: false,
            legacy_rejected: false,
            line: 0,
        }
    }

    pub fn with_legacy(mut self, legacy_id: u64, old_nr: u32) -> Self {
        self.legacy_id = legacy_id;
        self.old_nr = old_nr;
        self
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.networks.push(network.into());
        self
    }

    /// The legacy number if it is a usable signage number.
    pub fn legacy_number(&self) -> Option<u8> {
        u8::try_from(self.old_nr)
            .ok()
            .filter(|nr| (1..=MAX_NUMBER).contains(nr))
    }

    pub fn new_number(&self) -> Option<u8> {
        self.assignment.number()
    }

    /// Number of links attached to this node.
    pub fn degree(&self) -> usize {
        self.adjacency.len()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let new_nr = match self.assignment {
            Assignment::Assigned(nr) => nr.to_string(),
            Assignment::Unnumbered => "-".to_string(),
            Assignment::Pending => "?".to_string(),
            Assignment::Failed => "!".to_string(),
        };
        write!(
            f,
            "'{}'{{{}}}[{}]<{}|{}>",
            self.code, self.legacy_id, self.status, self.old_nr, new_nr
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(old_nr: u32) -> Node {
        Node::new(NodeId(0), "AB".parse().unwrap(), NodeStatus::Fix, Position::default())
            .with_legacy(17, old_nr)
    }

    #[test]
    fn test_legacy_number_range() {
        assert_eq!(node(12).legacy_number(), Some(12));
        assert_eq!(node(0).legacy_number(), None);
        assert_eq!(node(100).legacy_number(), None);
        assert_eq!(node(300).legacy_number(), None);
    }

    #[test]
    fn test_display_marks_assignment_state() {
        let mut n = node(12);
        assert_eq!(n.to_string(), "'AB'{17}[FIX]<12|?>");
        n.assignment = Assignment::Assigned(40);
        assert_eq!(n.to_string(), "'AB'{17}[FIX]<12|40>");
        n.assignment = Assignment::Failed;
        assert_eq!(n.to_string(), "'AB'{17}[FIX]<12|!>");
    }
}
