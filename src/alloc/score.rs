//! Candidate scoring.
//!
//! ```text
//! score = w.usage           · blend(usage delta)
//!       + w.same_distance   · min(cap, blend((d_same   - safe) / safe))
//!       + w.friend_distance · min(cap, blend((d_friend - safe) / safe))
//!       + w.shared_digit    · #neighbours sharing a tens or units digit
//! ```
//!
//! `None` means the candidate is disqualified. A numbered neighbour already
//! holding the candidate, or a trail claimed by another link, always
//! disqualifies. Two rules hold only in [`Mode::Strict`]: reuse closer than
//! the safe distance, and two numbered neighbours sharing a number (every
//! candidate would then put one trail on two links).

use crate::config::ScoreWeights;
use crate::model::NodeId;
use crate::topology::Topology;

use super::usage::UsageRegistry;

/// Ceiling of a distance term, reached when no holder is in range.
pub const DISTANCE_CAP: f64 = 3.0;

/// How strictly the reuse distance is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Strict,
    Lenient,
}

/// Linear above zero, cubic below: overshoot is punished steeply.
pub fn blend(delta: f64) -> f64 {
    if delta >= 0.0 { delta } else { delta + delta.powi(3) }
}

/// Scores candidate numbers for one node against the registry.
pub struct Scorer<'a> {
    pub topology: &'a Topology,
    pub usage: &'a UsageRegistry,
    pub weights: ScoreWeights,
    pub safe_distance_km: f64,
    /// Holders per number if participants were spread evenly.
    pub expected_per_number: f64,
}

impl Scorer<'_> {
    pub fn score(&self, node: NodeId, candidate: u8, mode: Mode) -> Option<f64> {
        let mut shared_digits = 0usize;
        let mut held = 0u128;
        let mut repeated = false;
        for (_, link, nr) in self.topology.numbered_neighbours(node) {
            if nr == candidate {
                return None;
            }
            if self.usage.trail(candidate, nr).is_some_and(|owner| owner != link) {
                return None;
            }
            if nr / 10 == candidate / 10 || nr % 10 == candidate % 10 {
                shared_digits += 1;
            }
            repeated |= held & (1 << nr) != 0;
            held |= 1 << nr;
        }
        if mode == Mode::Strict && repeated {
            return None;
        }

        let position = self.topology.node(node).position;

        let same = self
            .usage
            .usage(candidate)
            .and_then(|u| u.nearest_km(&position));
        if mode == Mode::Strict && same.is_some_and(|d| d < self.safe_distance_km) {
            return None;
        }

        let friend = self
            .usage
            .partners(candidate)
            .iter()
            .filter_map(|&p| self.usage.usage(p).and_then(|u| u.nearest_km(&position)))
            .min_by(f64::total_cmp);

        let w = &self.weights;
        Some(
            w.usage * self.usage_term(candidate)
                + w.same_distance * self.distance_term(same)
                + w.friend_distance * self.distance_term(friend)
                + w.shared_digit * shared_digits as f64,
        )
    }

    fn usage_term(&self, candidate: u8) -> f64 {
        if self.expected_per_number <= 0.0 {
            return 0.0;
        }
        let after = (self.usage.count(candidate) + 1) as f64;
        blend((self.expected_per_number - after) / self.expected_per_number)
    }

    fn distance_term(&self, nearest_km: Option<f64>) -> f64 {
        match nearest_km {
            Some(d) if self.safe_distance_km > 0.0 => {
                blend((d - self.safe_distance_km) / self.safe_distance_km).min(DISTANCE_CAP)
            }
            _ => DISTANCE_CAP,
        }
    }
}
