//! Results emitted by drag behaviors, and how they name their undo steps.

use glam::{EulerRot, Mat4, Quat, Vec3};
use selection::Aabb;

use crate::manipulator::ManipulatorMode;

/// Components smaller than this are treated as zero extent
const DEGENERATE_EXTENT: f32 = 1e-6;

/// One drag update, measured from the anchor captured at drag start.
///
/// Translate, Rotate, Scale and Skew are expressed in pivot-local space.
/// Bounds, NewBrush and Extrude carry world-space geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transformation {
    Translate(Vec3),
    Rotate(Quat),
    Scale(Vec3),
    /// Moves axis `which` in proportion to the coordinate along axis `by`
    Skew { which: usize, by: usize, amount: f32 },
    /// Resize from the start bounds to the current bounds
    Bounds { start: Aabb, current: Aabb },
    NewBrush(Aabb),
    /// Push the face normal to `axis` on the `positive` side outward by `distance`
    Extrude {
        axis: usize,
        positive: bool,
        distance: f32,
    },
}

impl Transformation {
    pub fn is_finite(&self) -> bool {
        match self {
            Transformation::Translate(v) | Transformation::Scale(v) => v.is_finite(),
            Transformation::Rotate(q) => q.is_finite(),
            Transformation::Skew { amount, .. } => amount.is_finite(),
            Transformation::Bounds { start, current } => {
                start.origin.is_finite()
                    && start.extents.is_finite()
                    && current.origin.is_finite()
                    && current.extents.is_finite()
            }
            Transformation::NewBrush(bounds) => bounds.origin.is_finite() && bounds.extents.is_finite(),
            Transformation::Extrude { distance, .. } => distance.is_finite(),
        }
    }

    /// Element index of the skew coefficient in a column-major 4x4 matrix
    pub fn skew_index(which: usize, by: usize) -> usize {
        by * 4 + which
    }

    /// Pivot-local matrix for the affine variants
    pub fn local_matrix(&self) -> Option<Mat4> {
        match *self {
            Transformation::Translate(t) => Some(Mat4::from_translation(t)),
            Transformation::Rotate(q) => Some(Mat4::from_quat(q)),
            Transformation::Scale(s) => Some(Mat4::from_scale(s)),
            Transformation::Skew { which, by, amount } => {
                let mut skew = Mat4::IDENTITY;
                skew.col_mut(by)[which] = amount;
                Some(skew)
            }
            _ => None,
        }
    }

    /// World-space matrix applied to objects, for variants that move them
    pub fn world_matrix(&self, pivot2world: &Mat4) -> Option<Mat4> {
        if let Transformation::Bounds { start, current } = self {
            let ratio = Vec3::select(
                start.extents.abs().cmpgt(Vec3::splat(DEGENERATE_EXTENT)),
                current.extents / start.extents,
                Vec3::ONE,
            );
            return Some(
                Mat4::from_translation(current.origin)
                    * Mat4::from_scale(ratio)
                    * Mat4::from_translation(-start.origin),
            );
        }
        let local = self.local_matrix()?;
        Some(*pivot2world * local * pivot2world.inverse())
    }
}

/// Undo transaction name for a committed drag.
///
/// `last` is the final update of the drag, `None` if every update was dropped.
pub fn undo_name(mode: ManipulatorMode, last: Option<&Transformation>) -> String {
    match (mode, last) {
        (_, Some(Transformation::NewBrush(_))) => "brushCreate".to_string(),
        (_, Some(Transformation::Bounds { .. })) => "resizeTool".to_string(),
        (_, Some(Transformation::Extrude { distance, .. })) => {
            format!("extrudeTool -distance {distance}")
        }
        (ManipulatorMode::Drag, Some(Transformation::Translate(_))) | (ManipulatorMode::Drag, None) => {
            "dragTool".to_string()
        }
        (_, Some(Transformation::Translate(t))) => {
            format!("translateTool -xyz {} {} {}", t.x, t.y, t.z)
        }
        (_, Some(Transformation::Rotate(q))) => {
            let (x, y, z) = q.to_euler(EulerRot::XYZ);
            format!(
                "rotateTool -eulerXYZ {} {} {}",
                x.to_degrees(),
                y.to_degrees(),
                z.to_degrees()
            )
        }
        (_, Some(Transformation::Scale(s))) => {
            format!("scaleTool -scale {} {} {}", s.x, s.y, s.z)
        }
        (_, Some(Transformation::Skew { which, by, amount })) => {
            format!(
                "skewTool -index {} -amount {}",
                Transformation::skew_index(*which, *by),
                amount
            )
        }
        (mode, None) => mode.tool_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_names() {
        assert_eq!(
            undo_name(ManipulatorMode::Translate, Some(&Transformation::Translate(Vec3::new(8.0, 0.0, -16.0)))),
            "translateTool -xyz 8 0 -16"
        );
        assert_eq!(
            undo_name(ManipulatorMode::Scale, Some(&Transformation::Scale(Vec3::new(2.0, 1.0, 1.0)))),
            "scaleTool -scale 2 1 1"
        );
        assert_eq!(
            undo_name(
                ManipulatorMode::Skew,
                Some(&Transformation::Skew { which: 0, by: 1, amount: 0.5 })
            ),
            "skewTool -index 4 -amount 0.5"
        );
        assert_eq!(
            undo_name(ManipulatorMode::Drag, Some(&Transformation::Translate(Vec3::X))),
            "dragTool"
        );
        assert_eq!(
            undo_name(ManipulatorMode::Drag, Some(&Transformation::NewBrush(Aabb::EMPTY))),
            "brushCreate"
        );
        assert_eq!(undo_name(ManipulatorMode::Rotate, None), "rotateTool");

        let rotate = Transformation::Rotate(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        let name = undo_name(ManipulatorMode::Rotate, Some(&rotate));
        let angles: Vec<f32> = name
            .trim_start_matches("rotateTool -eulerXYZ ")
            .split_whitespace()
            .map(|v| v.parse().unwrap())
            .collect();
        assert_eq!(angles.len(), 3, "{name}");
        assert!(angles[0].abs() < 1e-3 && angles[1].abs() < 1e-3);
        assert!((angles[2] - 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_skew_matrix() {
        let skew = Transformation::Skew { which: 0, by: 1, amount: 0.5 };
        let matrix = skew.local_matrix().unwrap();
        assert_eq!(matrix.transform_point3(Vec3::new(0.0, 2.0, 0.0)), Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(matrix.to_cols_array()[Transformation::skew_index(0, 1)], 0.5);
    }

    #[test]
    fn test_world_matrix_about_pivot() {
        let pivot = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0));
        let scale = Transformation::Scale(Vec3::new(2.0, 1.0, 1.0));
        let world = scale.world_matrix(&pivot).unwrap();
        assert_eq!(world.transform_point3(Vec3::new(10.0, 0.0, 0.0)), Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(world.transform_point3(Vec3::new(11.0, 0.0, 0.0)), Vec3::new(12.0, 0.0, 0.0));

        let bounds = Transformation::Bounds {
            start: Aabb::new(Vec3::ZERO, Vec3::ONE),
            current: Aabb::from_min_max(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(3.0, 1.0, 1.0)),
        };
        let world = bounds.world_matrix(&Mat4::IDENTITY).unwrap();
        assert_eq!(world.transform_point3(Vec3::ONE), Vec3::new(3.0, 1.0, 1.0));
        assert_eq!(world.transform_point3(-Vec3::ONE), -Vec3::ONE);

        assert!(Transformation::NewBrush(Aabb::EMPTY).world_matrix(&pivot).is_none());
    }

    #[test]
    fn test_non_finite_detected() {
        assert!(!Transformation::Scale(Vec3::new(f32::NAN, 1.0, 1.0)).is_finite());
        assert!(!Transformation::Skew { which: 0, by: 1, amount: f32::INFINITY }.is_finite());
        assert!(Transformation::Translate(Vec3::ONE).is_finite());
    }
}
