//! Ranking measure for pick candidates.

use std::cmp::Ordering;

use reticle_config::PickConfig;
use serde::{Deserialize, Serialize};

/// Sentinel stored in every field of an invalid intersection
const INVALID_FIELD: f32 = f32::MAX;

/// Tie bands used when ordering intersections
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntersectionBands {
    /// Screen distances within this band are tied
    pub distance: f32,
    /// Depths within this band are tied
    pub depth: f32,
}

impl Default for IntersectionBands {
    fn default() -> Self {
        Self {
            distance: reticle_config::DEFAULT_DISTANCE_BAND,
            depth: reticle_config::DEFAULT_DEPTH_BAND,
        }
    }
}

impl From<&PickConfig> for IntersectionBands {
    fn from(config: &PickConfig) -> Self {
        Self {
            distance: config.distance_band,
            depth: config.depth_band,
        }
    }
}

/// How good a hit a candidate is.
///
/// `depth` is the clip-space z after the perspective divide (smaller is nearer),
/// `distance` the squared screen distance from the pointer in the pick box and
/// `distance2` a secondary tie-break. An intersection is either fully valid
/// with finite fields or equal to [`SelectionIntersection::INVALID`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionIntersection {
    depth: f32,
    distance: f32,
    distance2: f32,
}

impl Default for SelectionIntersection {
    fn default() -> Self {
        Self::INVALID
    }
}

impl SelectionIntersection {
    /// The "no hit" value. Sorts after every valid intersection.
    pub const INVALID: Self = Self {
        depth: INVALID_FIELD,
        distance: INVALID_FIELD,
        distance2: INVALID_FIELD,
    };

    /// Create an intersection with no secondary tie-break
    pub fn new(depth: f32, distance: f32) -> Self {
        Self::with_tie_break(depth, distance, 0.0)
    }

    /// Create an intersection. Any non-finite field yields [`Self::INVALID`].
    pub fn with_tie_break(depth: f32, distance: f32, distance2: f32) -> Self {
        let usable = |v: f32| v.is_finite() && v.abs() < INVALID_FIELD;
        if usable(depth) && usable(distance) && usable(distance2) {
            Self {
                depth,
                distance,
                distance2,
            }
        } else {
            Self::INVALID
        }
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn distance2(&self) -> f32 {
        self.distance2
    }

    pub fn is_valid(&self) -> bool {
        self.distance < INVALID_FIELD
    }

    /// Screen distance first, then depth, then the tie-break. Differences
    /// inside a band fall through to the next key.
    ///
    /// Banding makes this non-transitive across chains of near ties: with
    /// distances 0, 0.6 and 1.2 bands apart and falling depths, each hit
    /// beats the previous one and the last loses to the first. Pairwise
    /// picks are fine; use [`SelectionPool`](crate::selector::SelectionPool)
    /// to rank many hits.
    pub fn compare(&self, other: &Self, bands: &IntersectionBands) -> Ordering {
        match (self.is_valid(), other.is_valid()) {
            (false, false) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (true, true) => {}
        }

        if (self.distance - other.distance).abs() > bands.distance {
            return self.distance.total_cmp(&other.distance);
        }
        if (self.depth - other.depth).abs() > bands.depth {
            return self.depth.total_cmp(&other.depth);
        }
        self.distance2.total_cmp(&other.distance2)
    }

    /// Returns true if `self` ranks strictly before `other`
    pub fn is_closer(&self, other: &Self, bands: &IntersectionBands) -> bool {
        self.compare(other, bands) == Ordering::Less
    }

    /// Replace `self` with `other` if `other` is closer
    pub fn assign_if_closer(&mut self, other: Self, bands: &IntersectionBands) {
        if other.is_closer(self, bands) {
            *self = other;
        }
    }

    /// Both valid, with distance and depth each within their epsilon
    pub fn equal_epsilon(&self, other: &Self, distance_epsilon: f32, depth_epsilon: f32) -> bool {
        self.is_valid()
            && other.is_valid()
            && (self.distance - other.distance).abs() <= distance_epsilon
            && (self.depth - other.depth).abs() <= depth_epsilon
    }
}
