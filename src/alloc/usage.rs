//! Numbers handed out so far, and the link trails they realise.

use std::collections::BTreeMap;
use std::fmt;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::model::{LinkId, NodeId, Position};

/// A node holding a number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Holder {
    pub node: NodeId,
    pub position: Position,
}

/// Holders of one number, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberUsage {
    pub holders: Vec<Holder>,
    /// Smallest distance between any two holders, km.
    pub min_distance_km: Option<f64>,
}

impl NumberUsage {
    /// Distance from `position` to the nearest holder.
    pub fn nearest_km(&self, position: &Position) -> Option<f64> {
        self.holders
            .iter()
            .map(|h| h.position.distance_km(position))
            .min_by(f64::total_cmp)
    }
}

/// Unordered pair of numbers joined by a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Trail(pub u8, pub u8);

impl Trail {
    pub fn new(a: u8, b: u8) -> Self {
        if a <= b { Trail(a, b) } else { Trail(b, a) }
    }

    /// The number on the other end of the trail, if `nr` is on it.
    pub fn partner(self, nr: u8) -> Option<u8> {
        if self.0 == nr {
            Some(self.1)
        } else if self.1 == nr {
            Some(self.0)
        } else {
            None
        }
    }
}

impl fmt::Display for Trail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.0, self.1)
    }
}

/// A second link that landed on an already claimed trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailConflict {
    pub trail: Trail,
    pub kept: LinkId,
    pub rejected: LinkId,
}

/// Registry of holders per number and links per trail.
#[derive(Debug, Clone, Default)]
pub struct UsageRegistry {
    numbers: BTreeMap<u8, NumberUsage>,
    trails: HashMap<Trail, LinkId>,
    /// Numbers each number is already linked to.
    partners: BTreeMap<u8, Vec<u8>>,
    conflicts: Vec<TrailConflict>,
}

impl UsageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn usage(&self, nr: u8) -> Option<&NumberUsage> {
        self.numbers.get(&nr)
    }

    pub fn count(&self, nr: u8) -> usize {
        self.numbers.get(&nr).map_or(0, |u| u.holders.len())
    }

    /// Total numbers handed out.
    pub fn total(&self) -> usize {
        self.numbers.values().map(|u| u.holders.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &NumberUsage)> {
        self.numbers.iter().map(|(&nr, u)| (nr, u))
    }

    /// Add a holder. Returns its distance to every earlier holder of `nr`.
    pub fn add_holder(&mut self, nr: u8, node: NodeId, position: Position) -> Vec<(NodeId, f64)> {
        let usage = self.numbers.entry(nr).or_default();
        let distances: Vec<(NodeId, f64)> = usage
            .holders
            .iter()
            .map(|h| (h.node, h.position.distance_km(&position)))
            .collect();
        for &(_, d) in &distances {
            usage.min_distance_km = Some(usage.min_distance_km.map_or(d, |m| m.min(d)));
        }
        usage.holders.push(Holder { node, position });
        distances
    }

    pub fn trail(&self, a: u8, b: u8) -> Option<LinkId> {
        self.trails.get(&Trail::new(a, b)).copied()
    }

    /// Numbers already linked to `nr` by a trail.
    pub fn partners(&self, nr: u8) -> &[u8] {
        self.partners.get(&nr).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Claim a trail for `link`. The first claim wins; a different link
    /// claiming the same trail is recorded and its holder returned.
    pub fn claim_trail(&mut self, a: u8, b: u8, link: LinkId) -> Result<(), LinkId> {
        let trail = Trail::new(a, b);
        match self.trails.get(&trail) {
            Some(&kept) if kept == link => Ok(()),
            Some(&kept) => {
                self.conflicts.push(TrailConflict { trail, kept, rejected: link });
                Err(kept)
            }
            None => {
                self.trails.insert(trail, link);
                self.partners.entry(a).or_default().push(b);
                if a != b {
                    self.partners.entry(b).or_default().push(a);
                }
                Ok(())
            }
        }
    }

    pub fn conflicts(&self) -> &[TrailConflict] {
        &self.conflicts
    }

    /// Claimed trails, ordered by number pair.
    pub fn trails(&self) -> BTreeMap<Trail, LinkId> {
        self.trails.iter().map(|(&t, &l)| (t, l)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holders_track_min_distance() {
        let mut reg = UsageRegistry::new();
        assert!(reg.add_holder(7, NodeId(0), Position::new(0.0, 0.0)).is_empty());
        let d = reg.add_holder(7, NodeId(1), Position::new(3000.0, 4000.0));
        assert_eq!(d, [(NodeId(0), 5.0)]);
        reg.add_holder(7, NodeId(2), Position::new(0.0, 1000.0));
        assert_eq!(reg.count(7), 3);
        assert_eq!(reg.usage(7).unwrap().min_distance_km, Some(1.0));
        assert_eq!(reg.usage(7).unwrap().nearest_km(&Position::new(0.0, 2000.0)), Some(1.0));
        assert_eq!(reg.total(), 3);
        assert_eq!(reg.count(8), 0);
    }

    #[test]
    fn test_first_trail_claim_wins() {
        let mut reg = UsageRegistry::new();
        assert_eq!(reg.claim_trail(12, 5, LinkId(1)), Ok(()));
        assert_eq!(reg.claim_trail(5, 12, LinkId(1)), Ok(()));
        assert_eq!(reg.claim_trail(5, 12, LinkId(2)), Err(LinkId(1)));
        assert_eq!(reg.trail(12, 5), Some(LinkId(1)));
        assert_eq!(reg.partners(5), [12]);
        assert_eq!(reg.partners(12), [5]);
        assert_eq!(reg.conflicts().len(), 1);
        assert_eq!(reg.conflicts()[0].trail, Trail(5, 12));
    }

    #[test]
    fn test_trail_partner() {
        assert_eq!(Trail::new(9, 3), Trail(3, 9));
        assert_eq!(Trail(3, 9).partner(9), Some(3));
        assert_eq!(Trail(3, 9).partner(4), None);
    }
}
