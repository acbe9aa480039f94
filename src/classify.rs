//! # Classifier
//!
//! Partitions the validated nodes into action buckets and derives the safe
//! reuse distance from the network's spatial density.
//!
//! | Bucket     | Statuses                                   | Allocation            |
//! |------------|--------------------------------------------|-----------------------|
//! | `Keep`     | FIXNEW, EXT, EXTNEW, FIX without a change   | legacy number as is   |
//! | `TryKeep`  | FIX touched by a DEL or NEW link            | legacy number if valid|
//! | `Update`   | IN                                         | scored search         |
//! | `Make`     | NEW                                        | scored search         |
//!
//! DEL nodes join no bucket. Each bucket is ordered by ascending distance
//! from the topology's reference node, first sighting first on ties.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::RenumConfig;
use crate::model::*;
use crate::ordered::insert_by_key;
use crate::topology::{Diagnostics, Topology};

/// Minimum branching factor of a participating node.
pub const MIN_DEGREE: usize = 3;

/// Allocation priority class of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Keep,
    TryKeep,
    Update,
    Make,
}

impl Bucket {
    /// Phase order of the allocator.
    pub const ORDER: [Bucket; 4] = [Bucket::Keep, Bucket::TryKeep, Bucket::Update, Bucket::Make];

    pub fn of(node: &Node) -> Option<Bucket> {
        match node.status {
            NodeStatus::New => Some(Bucket::Make),
            NodeStatus::In => Some(Bucket::Update),
            NodeStatus::Fix if node.must_change => Some(Bucket::TryKeep),
            NodeStatus::Fix | NodeStatus::FixNew | NodeStatus::Ext | NodeStatus::ExtNew => {
                Some(Bucket::Keep)
            }
            NodeStatus::Del => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::Keep => "keep",
            Bucket::TryKeep => "try-keep",
            Bucket::Update => "update",
            Bucket::Make => "make",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spatial density figures of the network envelope.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    /// Envelope rectangle, km².
    pub area_km2: f64,
    /// Half the rectangle: the diamond a network usually fills.
    pub diamond_km2: f64,
    /// Diamond area per node.
    pub avg_area_km2: f64,
    /// Diameter of a circle of `avg_area_km2`.
    pub avg_spacing_km: f64,
    /// Area one number covers when the label space is spread evenly.
    pub reuse_area_km2: f64,
    /// Diameter of a circle of `reuse_area_km2`.
    pub reuse_km: f64,
}

impl Dimensions {
    /// Derive from an envelope, a node count and the usable label space.
    pub fn derive(envelope: &Envelope, nodes: usize, label_space: usize) -> Self {
        let area_km2 = envelope.area_km2();
        if nodes == 0 {
            return Self { area_km2, diamond_km2: area_km2 / 2.0, ..Default::default() };
        }
        let diamond_km2 = area_km2 / 2.0;
        let avg_area_km2 = diamond_km2 / nodes as f64;
        let reuse_area_km2 = avg_area_km2 * label_space as f64;
        Self {
            area_km2,
            diamond_km2,
            avg_area_km2,
            avg_spacing_km: spacing(avg_area_km2),
            reuse_area_km2,
            reuse_km: spacing(reuse_area_km2),
        }
    }
}

fn spacing(area_km2: f64) -> f64 {
    2.0 * (area_km2 / PI).sqrt()
}

/// Distance of a node from the topology's reference node, 0 without one.
pub fn reference_distance(topology: &Topology, id: NodeId) -> f64 {
    match topology.reference {
        Some(r) => topology.node(r).position.distance_km(&topology.node(id).position),
        None => 0.0,
    }
}

/// Buckets and density figures computed once after the topology is loaded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Classification {
    buckets: [Vec<NodeId>; 4],
    pub dimensions: Dimensions,
    /// Minimum distance between two holders of the same number.
    pub safe_distance_km: f64,
    /// Degree → number of nodes.
    pub connectivity: BTreeMap<usize, usize>,
    /// Nodes with the highest degree.
    pub most_connected: Vec<NodeId>,
    /// Per bucket, how many nodes of each status it holds.
    pub bucket_statuses: BTreeMap<Bucket, BTreeMap<NodeStatus, usize>>,
}

impl Classification {
    pub fn bucket(&self, bucket: Bucket) -> &[NodeId] {
        &self.buckets[bucket.index()]
    }

    /// Nodes taking part in allocation, over all buckets.
    pub fn participants(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn bucket_of(&self, id: NodeId) -> Option<Bucket> {
        Bucket::ORDER
            .into_iter()
            .find(|&b| self.bucket(b).contains(&id))
    }
}

/// Bucket every node, run the connectivity checks and derive the reuse distance.
pub fn classify(
    topology: &Topology,
    config: &RenumConfig,
    diagnostics: &mut Diagnostics,
) -> Classification {
    let mut out = Classification::default();

    for node in topology.nodes() {
        let degree = node.degree();
        *out.connectivity.entry(degree).or_default() += 1;

        let exempt = matches!(node.status, NodeStatus::Del) || node.status.is_external();
        if degree < MIN_DEGREE && !exempt {
            diagnostics.node(node.line, node, format!("node has not enough links (={degree})"));
        }

        if node.status == NodeStatus::FixNew {
            let reaches_external = node
                .adjacency
                .values()
                .any(|adj| topology.node(adj.node).status.is_external());
            if !reaches_external {
                let message = "node in status FIXNEW has no link to an external node";
                diagnostics.node(node.line, node, message);
            }
        }

        let Some(bucket) = Bucket::of(node) else {
            continue;
        };
        *out.bucket_statuses
            .entry(bucket)
            .or_default()
            .entry(node.status)
            .or_default() += 1;
        insert_by_key(&mut out.buckets[bucket.index()], node.id, |&id| {
            reference_distance(topology, id)
        });
    }

    if let Some(&max) = out.connectivity.keys().next_back() {
        out.most_connected = topology
            .nodes()
            .filter(|n| n.degree() == max)
            .map(|n| n.id)
            .collect();
    }

    out.dimensions =
        Dimensions::derive(&topology.envelope, topology.node_count(), config.label_space());
    out.safe_distance_km = config
        .min_reuse_km
        .unwrap_or(out.dimensions.reuse_km * config.grace_factor);

    log_summary(topology, &out);
    out
}

fn log_summary(topology: &Topology, out: &Classification) {
    info!("dimensions: {:?}", out.dimensions);
    info!(safe_distance_km = out.safe_distance_km, "reuse distance");
    info!("count node by number of links: {:?}", out.connectivity);
    info!("count node by bucket, by status: {:?}", out.bucket_statuses);

    if let Some(first) = out.most_connected.first() {
        info!(degree = topology.node(*first).degree(), "node(s) with most links");
        for &id in &out.most_connected {
            let from = topology.node(id);
            info!("  from: {from}");
            for adj in from.adjacency.values() {
                let link = topology.link(adj.link);
                info!("    to: {} via {link} {}", topology.node(adj.node), adj.direction.arrow());
            }
        }
    }

    for bucket in Bucket::ORDER {
        info!(bucket = %bucket, nodes = out.bucket(bucket).len(), "bucket size");
    }
}
