//! # Topology
//!
//! The validated node/link graph of one run, built once from raw rows and
//! then only annotated (`must_change`, assignments).
//!
//! ```text
//! node rows ─┐
//!            ├─ TopologyBuilder ── finish() ──> (Topology, Diagnostics)
//! link rows ─┘     merges repeats, checks invariants, links adjacency
//! ```
//!
//! Nodes and links live in arenas indexed by [`NodeId`] / [`LinkId`];
//! codes and link keys resolve through hash indexes. Iteration over
//! `nodes()` follows first-sighting order.

pub mod builder;
pub mod diagnostics;
pub mod records;

use std::collections::BTreeMap;

use hashbrown::HashMap;

use crate::model::*;

pub use builder::TopologyBuilder;
pub use diagnostics::{Diagnostics, GlobalIssue, IssueKind, LinkIssue, NodeIssue};
pub use records::{LinkRecord, NodeRecord};

/// Validated network graph.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: Vec<Node>,
    links: Vec<Link>,
    node_index: HashMap<Code, NodeId>,
    link_index: HashMap<LinkKey, LinkId>,
    /// Bounding rectangle of all node positions.
    pub envelope: Envelope,
    /// Southernmost IN/FIX node.
    pub reference: Option<NodeId>,
    /// Highest code seen on any node.
    pub max_code: Option<Code>,
    /// Highest code among nodes with an existing code.
    pub max_existing_code: Option<Code>,
    /// Lowest code among nodes with a new code.
    pub min_new_code: Option<Code>,
    pub node_histogram: BTreeMap<NodeStatus, usize>,
    pub link_histogram: BTreeMap<LinkStatus, usize>,
}

impl Topology {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.0]
    }

    pub fn link_mut(&mut self, id: LinkId) -> &mut Link {
        &mut self.links[id.0]
    }

    pub fn node_by_code(&self, code: Code) -> Option<&Node> {
        self.node_index.get(&code).map(|&id| self.node(id))
    }

    pub fn link_by_key(&self, key: LinkKey) -> Option<&Link> {
        self.link_index.get(&key).map(|&id| self.link(id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn contains_code(&self, code: Code) -> bool {
        self.node_index.contains_key(&code)
    }

    pub(crate) fn node_id(&self, code: Code) -> Option<NodeId> {
        self.node_index.get(&code).copied()
    }

    pub(crate) fn link_id(&self, key: LinkKey) -> Option<LinkId> {
        self.link_index.get(&key).copied()
    }

    pub(crate) fn push_node(&mut self, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.id = id;
        self.node_index.insert(node.code, id);
        self.nodes.push(node);
        id
    }

    pub(crate) fn push_link(&mut self, mut link: Link) -> LinkId {
        let id = LinkId(self.links.len());
        link.id = id;
        self.link_index.insert(link.key, id);
        self.links.push(link);
        id
    }

    /// Numbered neighbours of `id`: (neighbour, link, neighbour's number).
    pub fn numbered_neighbours(
        &self,
        id: NodeId,
    ) -> impl Iterator<Item = (NodeId, LinkId, u8)> + '_ {
        self.node(id).adjacency.values().filter_map(move |adj| {
            self.node(adj.node)
                .new_number()
                .map(|nr| (adj.node, adj.link, nr))
        })
    }
}
