//! Run configuration.
//!
//! Every numeric threshold is checked by [`RenumConfig::validate`] before
//! any row is read; a bad value aborts the run with [`Error::Config`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::{Code, MAX_NUMBER};
use crate::{Error, Result};

/// Relative weights of the four scoring terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Reward for numbers used less than the even share.
    pub usage: f64,
    /// Reward for distance to other holders of the same number.
    pub same_distance: f64,
    /// Reward for distance to holders of numbers already linked to the candidate.
    pub friend_distance: f64,
    /// Bonus per adjacent number sharing a tens or units digit.
    pub shared_digit: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            usage: 1.0,
            same_distance: 2.0,
            friend_distance: 1.0,
            shared_digit: 0.25,
        }
    }
}

impl ScoreWeights {
    fn all(&self) -> [f64; 4] {
        [self.usage, self.same_distance, self.friend_distance, self.shared_digit]
    }
}

/// Configuration of one renumbering run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenumConfig {
    /// Last code of the existing range; new codes must not sort before it.
    pub cutoff: String,
    /// Lower link length bound in km (inclusive).
    pub min_link_km: f64,
    /// Upper link length bound in km (exclusive).
    pub max_link_km: f64,
    /// Numbers withheld from normal allocation.
    pub spare_numbers: Vec<u8>,
    pub output_dir: PathBuf,
    /// Multiplier on the derived reuse distance; below 1 allows overlap.
    pub grace_factor: f64,
    /// Replaces the derived reuse distance when set.
    pub min_reuse_km: Option<f64>,
    pub weights: ScoreWeights,
}

impl Default for RenumConfig {
    fn default() -> Self {
        Self {
            cutoff: "TZ".to_string(),
            min_link_km: 0.0,
            max_link_km: 50.0,
            spare_numbers: Vec::new(),
            output_dir: PathBuf::from("/tmp/renum"),
            grace_factor: 1.0,
            min_reuse_km: None,
            weights: ScoreWeights::default(),
        }
    }
}

impl RenumConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Parsed cutoff code.
    pub fn cutoff_code(&self) -> Result<Code> {
        self.cutoff.parse()
    }

    /// Spare numbers as an ordered set.
    pub fn spares(&self) -> BTreeSet<u8> {
        self.spare_numbers.iter().copied().collect()
    }

    /// Size of the normal label space: 99 minus spares.
    pub fn label_space(&self) -> usize {
        usize::from(MAX_NUMBER) - self.spares().len()
    }

    /// Check every threshold. Fatal on the first violation.
    pub fn validate(&self) -> Result<()> {
        self.cutoff_code()?;

        for (name, v) in [("min_link_km", self.min_link_km), ("max_link_km", self.max_link_km)] {
            if !v.is_finite() || v < 0.0 {
                return Err(Error::Config(format!("{name} must be a non-negative number, got {v}")));
            }
        }
        if self.min_link_km >= self.max_link_km {
            return Err(Error::Config(format!(
                "min_link_km ({}) must be below max_link_km ({})",
                self.min_link_km, self.max_link_km
            )));
        }

        let mut seen = BTreeSet::new();
        for &nr in &self.spare_numbers {
            if !(1..=MAX_NUMBER).contains(&nr) {
                return Err(Error::Config(format!("spare number {nr} outside 1..={MAX_NUMBER}")));
            }
            if !seen.insert(nr) {
                return Err(Error::Config(format!("spare number {nr} listed twice")));
            }
        }
        if seen.len() >= usize::from(MAX_NUMBER) {
            return Err(Error::Config("every number is spare; nothing left to allocate".into()));
        }

        if !self.grace_factor.is_finite() || self.grace_factor <= 0.0 {
            return Err(Error::Config(format!(
                "grace_factor must be positive, got {}",
                self.grace_factor
            )));
        }
        if let Some(d) = self.min_reuse_km {
            if !d.is_finite() || d <= 0.0 {
                return Err(Error::Config(format!("min_reuse_km must be positive, got {d}")));
            }
        }
        if self.weights.all().iter().any(|w| !w.is_finite()) {
            return Err(Error::Config("score weights must be finite".into()));
        }
        Ok(())
    }
}

/// Parse a comma-separated spare list such as `"13, 66,99"`.
pub fn parse_spare_numbers(raw: &str) -> Result<Vec<u8>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u8>()
                .map_err(|_| Error::Config(format!("spare number '{s}' is not a number 1..=99")))
        })
        .collect()
}
