//! Planar positions and the bounding envelope.
//!
//! Positions are projected coordinates in metres; every distance this
//! crate reports is in kilometres.

use serde::{Deserialize, Serialize};

const METRES_PER_KM: f64 = 1000.0;

/// Projected position in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Straight-line distance in km.
    pub fn distance_km(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y) / METRES_PER_KM
    }

    /// True when `self` lies in the rectangle spanned by `a` and `b`.
    pub fn is_between(&self, a: &Position, b: &Position) -> bool {
        let (lo_x, hi_x) = if a.x <= b.x { (a.x, b.x) } else { (b.x, a.x) };
        let (lo_y, hi_y) = if a.y <= b.y { (a.y, b.y) } else { (b.y, a.y) };
        (lo_x..=hi_x).contains(&self.x) && (lo_y..=hi_y).contains(&self.y)
    }
}

/// Geographic coordinates, carried through for reporting only.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// Running bounding rectangle of all node positions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Envelope {
    bounds: Option<(Position, Position)>,
}

impl Envelope {
    pub fn extend(&mut self, p: Position) {
        self.bounds = Some(match self.bounds {
            None => (p, p),
            Some((lo, hi)) => (
                Position::new(lo.x.min(p.x), lo.y.min(p.y)),
                Position::new(hi.x.max(p.x), hi.y.max(p.y)),
            ),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    pub fn min(&self) -> Option<Position> {
        self.bounds.map(|(lo, _)| lo)
    }

    pub fn max(&self) -> Option<Position> {
        self.bounds.map(|(_, hi)| hi)
    }

    /// Rectangle area in km².
    pub fn area_km2(&self) -> f64 {
        match self.bounds {
            None => 0.0,
            Some((lo, hi)) => {
                (hi.x - lo.x) * (hi.y - lo.y) / (METRES_PER_KM * METRES_PER_KM)
            }
        }
    }
}
