//! # Allocation engine
//!
//! Assigns every bucketed node a number in four strictly ordered phases.
//! Later phases see every number committed by earlier ones.
//!
//! ```text
//! KEEP ──> TRY-KEEP ──> UPDATE ──> MAKE
//!            │ legacy number disqualified
//!            └──────────> inserted into UPDATE by distance
//! ```
//!
//! Candidate search in UPDATE and MAKE walks a ladder and stops at the
//! first stage that yields a candidate:
//!
//! | Stage     | Numbers                                     | Mode    |
//! |-----------|---------------------------------------------|---------|
//! | `Normal`  | 1..=99 minus spares and the rejected legacy | strict  |
//! | `Spare`   | spare numbers                               | strict  |
//! | `Lenient` | 1..=99                                      | lenient |
//!
//! A node that fails all three is [`Assignment::Failed`] and reported.

pub mod score;
pub mod usage;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classify::{reference_distance, Bucket, Classification};
use crate::config::{RenumConfig, ScoreWeights};
use crate::model::*;
use crate::ordered::{insert_by_key, ordered_insert};
use crate::topology::{Diagnostics, IssueKind, Topology};

pub use score::{blend, Mode, Scorer};
pub use usage::{Holder, NumberUsage, Trail, TrailConflict, UsageRegistry};

/// Rung of the candidate ladder that produced a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Normal,
    Spare,
    Lenient,
}

/// Counters of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseStats {
    pub bucket: Bucket,
    pub nodes: usize,
    /// Nodes that ended with their legacy number.
    pub kept: usize,
    /// Nodes handed on to the UPDATE phase.
    pub forwarded: usize,
    /// Pinned nodes left without a number.
    pub unnumbered: usize,
    pub normal: usize,
    pub spare: usize,
    pub lenient: usize,
    pub failed: usize,
}

impl PhaseStats {
    fn new(bucket: Bucket, nodes: usize) -> Self {
        Self {
            bucket,
            nodes,
            kept: 0,
            forwarded: 0,
            unnumbered: 0,
            normal: 0,
            spare: 0,
            lenient: 0,
            failed: 0,
        }
    }

    fn count(&mut self, stage: Stage) {
        match stage {
            Stage::Normal => self.normal += 1,
            Stage::Spare => self.spare += 1,
            Stage::Lenient => self.lenient += 1,
        }
    }
}

/// What the allocator leaves behind besides the node assignments.
#[derive(Debug, Clone, Default)]
pub struct Allocation {
    pub usage: UsageRegistry,
    pub phases: Vec<PhaseStats>,
    /// Nodes that found no candidate at all.
    pub failed: Vec<NodeId>,
    pub safe_distance_km: f64,
}

/// Four-phase allocator over one topology.
pub struct Allocator<'a> {
    topology: &'a mut Topology,
    diagnostics: &'a mut Diagnostics,
    usage: UsageRegistry,
    spares: BTreeSet<u8>,
    weights: ScoreWeights,
    safe_distance_km: f64,
    expected_per_number: f64,
    failed: Vec<NodeId>,
}

impl<'a> Allocator<'a> {
    pub fn new(
        topology: &'a mut Topology,
        diagnostics: &'a mut Diagnostics,
        classification: &Classification,
        config: &RenumConfig,
    ) -> Self {
        let label_space = config.label_space().max(1);
        Self {
            topology,
            diagnostics,
            usage: UsageRegistry::new(),
            spares: config.spares(),
            weights: config.weights,
            safe_distance_km: classification.safe_distance_km,
            expected_per_number: classification.participants() as f64 / label_space as f64,
            failed: Vec::new(),
        }
    }

    /// Run all phases in order and hand back the registry.
    pub fn run(mut self, classification: &Classification) -> Allocation {
        info!(
            nodes = classification.participants(),
            safe_distance_km = self.safe_distance_km,
            "allocation started"
        );

        let mut phases = Vec::with_capacity(Bucket::ORDER.len());
        let mut update: Vec<NodeId> = classification.bucket(Bucket::Update).to_vec();

        let (keep, forwarded) = self.keep_phase(classification.bucket(Bucket::Keep));
        phases.push(keep);
        self.forward(&mut update, forwarded);

        let (try_keep, forwarded) = self.try_keep_phase(classification.bucket(Bucket::TryKeep));
        phases.push(try_keep);
        self.forward(&mut update, forwarded);

        phases.push(self.search_phase(Bucket::Update, &update));
        phases.push(self.search_phase(Bucket::Make, classification.bucket(Bucket::Make)));

        for p in &phases {
            info!(
                bucket = %p.bucket,
                nodes = p.nodes,
                kept = p.kept,
                forwarded = p.forwarded,
                spare = p.spare,
                lenient = p.lenient,
                failed = p.failed,
                "phase done"
            );
        }
        info!(
            numbered = self.usage.total(),
            trails = self.usage.trails().len(),
            conflicts = self.usage.conflicts().len(),
            "allocation finished"
        );

        Allocation {
            usage: self.usage,
            phases,
            failed: self.failed,
            safe_distance_km: self.safe_distance_km,
        }
    }

    /// Insert forwarded nodes into the UPDATE list by reference distance.
    fn forward(&self, update: &mut Vec<NodeId>, nodes: Vec<NodeId>) {
        for id in nodes {
            insert_by_key(update, id, |&n| reference_distance(&*self.topology, n));
        }
    }

    // ========================================================================
    // Phases
    // ========================================================================

    /// Legacy numbers are registered as is.
    fn keep_phase(&mut self, nodes: &[NodeId]) -> (PhaseStats, Vec<NodeId>) {
        let mut stats = PhaseStats::new(Bucket::Keep, nodes.len());
        let mut forwarded = Vec::new();
        for &id in nodes {
            let node = self.topology.node(id);
            match (node.legacy_number(), node.status) {
                (Some(nr), _) => {
                    self.register(id, nr);
                    stats.kept += 1;
                }
                (None, NodeStatus::Fix) => {
                    debug!(node = %node, "kept node without legacy number, searching");
                    forwarded.push(id);
                    stats.forwarded += 1;
                }
                (None, _) => {
                    self.topology.node_mut(id).assignment = Assignment::Unnumbered;
                    stats.unnumbered += 1;
                }
            }
        }
        (stats, forwarded)
    }

    /// Legacy numbers survive only if they pass the strict constraints.
    fn try_keep_phase(&mut self, nodes: &[NodeId]) -> (PhaseStats, Vec<NodeId>) {
        let mut stats = PhaseStats::new(Bucket::TryKeep, nodes.len());
        let mut forwarded = Vec::new();
        for &id in nodes {
            let legacy = self.topology.node(id).legacy_number();
            let passes = legacy.filter(|&nr| self.scorer().score(id, nr, Mode::Strict).is_some());
            match passes {
                Some(nr) => {
                    self.register(id, nr);
                    stats.kept += 1;
                }
                None => {
                    let node = self.topology.node_mut(id);
                    node.legacy_rejected = legacy.is_some();
                    debug!(node = %node, "legacy number rejected");
                    forwarded.push(id);
                    stats.forwarded += 1;
                }
            }
        }
        (stats, forwarded)
    }

    fn search_phase(&mut self, bucket: Bucket, nodes: &[NodeId]) -> PhaseStats {
        let mut stats = PhaseStats::new(bucket, nodes.len());
        for &id in nodes {
            match self.search(id) {
                Some((nr, stage)) => {
                    self.register(id, nr);
                    stats.count(stage);
                    if self.topology.node(id).legacy_number() == Some(nr) {
                        stats.kept += 1;
                    }
                }
                None => {
                    self.fail(id);
                    stats.failed += 1;
                }
            }
        }
        stats
    }

    // ========================================================================
    // Candidate search
    // ========================================================================

    fn scorer(&self) -> Scorer<'_> {
        Scorer {
            topology: &*self.topology,
            usage: &self.usage,
            weights: self.weights,
            safe_distance_km: self.safe_distance_km,
            expected_per_number: self.expected_per_number,
        }
    }

    /// Walk the candidate ladder; the first stage with a candidate wins.
    fn search(&self, id: NodeId) -> Option<(u8, Stage)> {
        let node = self.topology.node(id);
        let rejected = if node.legacy_rejected { node.legacy_number() } else { None };

        let normal: Vec<u8> = (1..=MAX_NUMBER)
            .filter(|nr| !self.spares.contains(nr) && Some(*nr) != rejected)
            .collect();
        let spare: Vec<u8> = self.spares.iter().copied().collect();
        let all: Vec<u8> = (1..=MAX_NUMBER).collect();

        let ladder = [
            (normal, Stage::Normal, Mode::Strict),
            (spare, Stage::Spare, Mode::Strict),
            (all, Stage::Lenient, Mode::Lenient),
        ];
        ladder.into_iter().find_map(|(candidates, stage, mode)| {
            self.rank(id, &candidates, mode)
                .first()
                .map(|&(nr, _)| (nr, stage))
        })
    }

    /// Passing candidates, best score first; ties keep ascending number order.
    pub fn rank(&self, id: NodeId, candidates: &[u8], mode: Mode) -> Vec<(u8, f64)> {
        let scorer = self.scorer();
        let mut ranked: Vec<(u8, f64)> = Vec::with_capacity(candidates.len());
        for &nr in candidates {
            if let Some(score) = scorer.score(id, nr, mode) {
                ordered_insert(&mut ranked, (nr, score), |a, b| b.1.total_cmp(&a.1));
            }
        }
        ranked
    }

    // ========================================================================
    // Registration
    // ========================================================================

    fn register(&mut self, id: NodeId, nr: u8) {
        let node = self.topology.node_mut(id);
        node.assignment = Assignment::Assigned(nr);
        let position = node.position;

        for (other, d) in self.usage.add_holder(nr, id, position) {
            if d < self.safe_distance_km {
                let message = format!(
                    "reusing nr {nr} between {} and {} on dist of {d:.2} km",
                    self.topology.node(id),
                    self.topology.node(other)
                );
                self.diagnostics.global(IssueKind::ReuseDistance, message);
            }
        }

        let neighbours: Vec<(NodeId, LinkId, u8)> = self.topology.numbered_neighbours(id).collect();
        for (other, link, other_nr) in neighbours {
            if other_nr == nr {
                let message = format!(
                    "two same nrs from {} to {} adjacent in link {}",
                    self.topology.node(id),
                    self.topology.node(other),
                    self.topology.link(link)
                );
                self.diagnostics.global(IssueKind::AdjacentSameNumber, message);
            }
            if let Err(kept) = self.usage.claim_trail(nr, other_nr, link) {
                let message = format!(
                    "duplicate link-trail {} for {} and {}",
                    Trail::new(nr, other_nr),
                    self.topology.link(link),
                    self.topology.link(kept)
                );
                self.diagnostics.global(IssueKind::DuplicateTrail, message);
            }
        }
        debug!(node = %self.topology.node(id), "registered");
    }

    fn fail(&mut self, id: NodeId) {
        let node = self.topology.node_mut(id);
        node.assignment = Assignment::Failed;
        warn!(node = %node, "no candidate number");
        let message = format!("no candidate number for {node}, not even in lenient mode");
        self.diagnostics.global(IssueKind::AllocationFailed, message);
        self.failed.push(id);
    }
}

/// Build an [`Allocator`] and run it.
pub fn allocate(
    topology: &mut Topology,
    diagnostics: &mut Diagnostics,
    classification: &Classification,
    config: &RenumConfig,
) -> Allocation {
    Allocator::new(topology, diagnostics, classification, config).run(classification)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_count_by_stage() {
        let mut s = PhaseStats::new(Bucket::Make, 3);
        s.count(Stage::Normal);
        s.count(Stage::Lenient);
        s.count(Stage::Lenient);
        assert_eq!((s.normal, s.spare, s.lenient), (1, 0, 2));
    }

    #[test]
    fn test_rank_orders_by_descending_score() {
        let mut topology = Topology::default();
        let id = topology.push_node(Node::new(
            NodeId(0),
            "AA".parse().unwrap(),
            NodeStatus::New,
            Position::default(),
        ));
        let mut diagnostics = Diagnostics::default();
        let mut classification = Classification::default();
        classification.safe_distance_km = 10.0;
        let config = RenumConfig::default();
        let mut alloc = Allocator::new(&mut topology, &mut diagnostics, &classification, &config);
        alloc.usage.add_holder(3, NodeId(9), Position::new(15_000.0, 0.0));

        let ranked = alloc.rank(id, &[3, 4, 5], Mode::Strict);
        let order: Vec<u8> = ranked.iter().map(|&(nr, _)| nr).collect();
        assert_eq!(order, [4, 5, 3]);
    }
}
