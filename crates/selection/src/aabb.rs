//! Axis-aligned bounding box stored as center and half extents.

use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub origin: Vec3,
    /// Half size along each axis. Negative extents mark an empty box.
    pub extents: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    pub const EMPTY: Self = Self {
        origin: Vec3::ZERO,
        extents: Vec3::splat(-1.0),
    };

    pub fn new(origin: Vec3, extents: Vec3) -> Self {
        Self { origin, extents }
    }

    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self {
            origin: (min + max) * 0.5,
            extents: (max - min) * 0.5,
        }
    }

    pub fn min(&self) -> Vec3 {
        self.origin - self.extents
    }

    pub fn max(&self) -> Vec3 {
        self.origin + self.extents
    }

    /// True unless any extent is negative
    pub fn is_valid(&self) -> bool {
        self.extents.cmpge(Vec3::ZERO).all() && self.origin.is_finite() && self.extents.is_finite()
    }

    /// Grow to include a point
    pub fn extend_point(&mut self, point: Vec3) {
        if !self.is_valid() {
            *self = Self::new(point, Vec3::ZERO);
            return;
        }
        *self = Self::from_min_max(self.min().min(point), self.max().max(point));
    }

    /// Grow to include another box
    pub fn extend(&mut self, other: &Aabb) {
        if !other.is_valid() {
            return;
        }
        if !self.is_valid() {
            *self = *other;
            return;
        }
        *self = Self::from_min_max(self.min().min(other.min()), self.max().max(other.max()));
    }

    pub fn contains(&self, point: Vec3) -> bool {
        self.is_valid() && (point - self.origin).abs().cmple(self.extents).all()
    }

    /// The 8 corners, indexed by bits (x, y, z) of the index
    pub fn corners(&self) -> [Vec3; 8] {
        let (min, max) = (self.min(), self.max());
        std::array::from_fn(|i| {
            Vec3::new(
                if i & 1 != 0 { max.x } else { min.x },
                if i & 2 != 0 { max.y } else { min.y },
                if i & 4 != 0 { max.z } else { min.z },
            )
        })
    }

    /// The 4 corners of the face normal to `axis` on the `positive` side,
    /// wound counter-clockwise when viewed from outside the box.
    pub fn face(&self, axis: usize, positive: bool) -> [Vec3; 4] {
        let u = (axis + 1) % 3;
        let v = (axis + 2) % 3;
        let (min, max) = (self.min(), self.max());
        let corner = |hi_u: bool, hi_v: bool| {
            let mut p = if positive { max } else { min };
            p[u] = if hi_u { max[u] } else { min[u] };
            p[v] = if hi_v { max[v] } else { min[v] };
            p
        };
        let ring = [
            corner(false, false),
            corner(true, false),
            corner(true, true),
            corner(false, true),
        ];
        if positive {
            ring
        } else {
            [ring[3], ring[2], ring[1], ring[0]]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max() {
        let aabb = Aabb::from_min_max(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(3.0, 2.0, 4.0));
        assert_eq!(aabb.origin, Vec3::new(1.0, 1.0, 3.0));
        assert_eq!(aabb.extents, Vec3::new(2.0, 1.0, 1.0));
        assert_eq!(aabb.min(), Vec3::new(-1.0, 0.0, 2.0));
    }

    #[test]
    fn test_extend_from_empty() {
        let mut aabb = Aabb::EMPTY;
        assert!(!aabb.is_valid());
        aabb.extend_point(Vec3::ONE);
        aabb.extend_point(-Vec3::ONE);
        assert_eq!(aabb, Aabb::new(Vec3::ZERO, Vec3::ONE));
        assert!(aabb.contains(Vec3::new(0.5, -1.0, 0.0)));
        assert!(!aabb.contains(Vec3::new(1.5, 0.0, 0.0)));
    }

    #[test]
    fn test_face_winding_points_outward() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        for axis in 0..3 {
            for positive in [true, false] {
                let f = aabb.face(axis, positive);
                let normal = (f[1] - f[0]).cross(f[2] - f[0]);
                let expected = if positive { 1.0 } else { -1.0 };
                assert!(normal[axis] * expected > 0.0, "axis {axis} positive {positive}");
                for p in f {
                    assert_eq!(p[axis], expected);
                }
            }
        }
    }
}
