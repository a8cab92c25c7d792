//! Drag behaviors.
//!
//! Every behavior follows the same two-call protocol: [`Manipulatable::construct`]
//! captures the anchor when the drag starts, then [`Manipulatable::transform`]
//! is called for each pointer move and returns the whole transformation from
//! that anchor. `transform` takes `&self`, so repeating a device point always
//! yields the same result.

use glam::{BVec3, Mat4, Quat, Vec2, Vec3};
use reticle_config::ManipulatorConfig;
use selection::Aabb;
use tracing::trace;

use crate::modifiers::InputModifiers;
use crate::ray::{
    angle_for_axis, constrain_to_axis, largest_axis, point_on_axis, point_on_plane, point_on_sphere,
    ray_for_device_point, rotation_between, snapped, snapped_vec3, translation_local2object, unit_axis,
};
use crate::transformation::Transformation;

/// Denominators below this are treated as zero
const EPSILON: f32 = 1e-6;

/// Per-event input shared by construct and transform
#[derive(Debug, Clone, Copy)]
pub struct DragInput<'a> {
    pub device2manip: Mat4,
    pub device_point: Vec2,
    pub modifiers: InputModifiers,
    pub config: &'a ManipulatorConfig,
}

/// Translate in the screen plane through the pivot
#[derive(Debug, Clone, Default)]
pub struct TranslateFree {
    start: Option<Vec3>,
    /// Anchor on the manipulation Z axis, used while alt is held
    start_z: Option<Vec3>,
    bounds: Aabb,
}

impl TranslateFree {
    fn construct(&mut self, input: &DragInput, bounds: &Aabb) {
        self.start = point_on_plane(&input.device2manip, input.device_point);
        self.start_z = point_on_axis(Vec3::Z, &input.device2manip, input.device_point);
        self.bounds = *bounds;
    }

    fn transform(&self, input: &DragInput, manip2object: &Mat4) -> Option<Transformation> {
        let mut delta = if input.modifiers.alt {
            point_on_axis(Vec3::Z, &input.device2manip, input.device_point)? - self.start_z?
        } else {
            point_on_plane(&input.device2manip, input.device_point)? - self.start?
        };

        if input.modifiers.shift {
            let keep = largest_axis(delta);
            delta = unit_axis(keep) * delta[keep];
        }

        let translation = translation_local2object(delta, manip2object);
        let grid = input.config.grid_size;
        let translation = if input.modifiers.ctrl && self.bounds.is_valid() {
            snap_bounds_translation(translation, &self.bounds, grid)
        } else {
            snapped_vec3(translation, grid)
        };
        Some(Transformation::Translate(translation))
    }
}

/// Adjust a translation so the nearer face of `bounds` lands on the grid
fn snap_bounds_translation(translation: Vec3, bounds: &Aabb, grid: f32) -> Vec3 {
    if grid <= 0.0 {
        return translation;
    }
    let mut snapped_translation = translation;
    let (min, max) = (bounds.min() + translation, bounds.max() + translation);
    for i in 0..3 {
        let to_min = snapped(min[i], grid) - min[i];
        let to_max = snapped(max[i], grid) - max[i];
        snapped_translation[i] += if to_min.abs() <= to_max.abs() { to_min } else { to_max };
    }
    snapped_translation
}

/// Translate along one manipulation axis
#[derive(Debug, Clone)]
pub struct TranslateAxis {
    axis: Vec3,
    start: Option<Vec3>,
}

impl TranslateAxis {
    pub fn new(axis: Vec3) -> Self {
        Self { axis, start: None }
    }

    fn construct(&mut self, input: &DragInput) {
        self.start = point_on_axis(self.axis, &input.device2manip, input.device_point);
    }

    fn transform(&self, input: &DragInput, manip2object: &Mat4) -> Option<Transformation> {
        let current = point_on_axis(self.axis, &input.device2manip, input.device_point)?;
        let translation = translation_local2object(current - self.start?, manip2object);
        Some(Transformation::Translate(snapped_vec3(
            translation,
            input.config.grid_size,
        )))
    }
}

/// World bounds re-boxed in the pivot frame, so local axes line up with the handles
fn bounds_in_pivot_frame(bounds: &Aabb, pivot2world: &Mat4) -> Aabb {
    if !bounds.is_valid() {
        return Aabb::EMPTY;
    }
    let world2pivot = pivot2world.inverse();
    let mut local = Aabb::EMPTY;
    for corner in bounds.corners() {
        local.extend_point(world2pivot.transform_point3(corner));
    }
    local
}

/// Extent from the pivot to the farther bounds face, per pivot axis
fn chosen_extent(bounds: &Aabb, pivot2world: &Mat4) -> Vec3 {
    let local = bounds_in_pivot_frame(bounds, pivot2world);
    if !local.is_valid() {
        return Vec3::ZERO;
    }
    local.max().max(-local.min())
}

/// Per-axis scale for an object-space pointer displacement.
///
/// Bounds-relative when the chosen extent is large enough, otherwise relative
/// to the start point. Axes with neither reference keep a scale of 1.
fn scale_factors(delta: Vec3, start: Vec3, chosen: Vec3, min_extent: f32) -> Vec3 {
    let mut scale = Vec3::ONE;
    for i in 0..3 {
        if chosen[i] > min_extent {
            scale[i] = (chosen[i] + delta[i]) / chosen[i];
        } else if start[i].abs() > EPSILON {
            scale[i] = 1.0 + delta[i] / start[i];
        }
    }
    scale
}

fn accept_scale(scale: Vec3) -> Option<Transformation> {
    if !scale.is_finite() || scale.abs().min_element() < EPSILON {
        trace!("Dropping degenerate scale {:?}", scale);
        return None;
    }
    Some(Transformation::Scale(scale))
}

/// Scale along one manipulation axis
#[derive(Debug, Clone)]
pub struct ScaleAxis {
    axis: Vec3,
    start: Option<Vec3>,
    chosen_extent: Vec3,
}

impl ScaleAxis {
    pub fn new(axis: Vec3) -> Self {
        Self {
            axis,
            start: None,
            chosen_extent: Vec3::ZERO,
        }
    }

    fn construct(&mut self, input: &DragInput, bounds: &Aabb, pivot2world: &Mat4) {
        self.start = point_on_axis(self.axis, &input.device2manip, input.device_point);
        self.chosen_extent = chosen_extent(bounds, pivot2world);
    }

    fn transform(&self, input: &DragInput, manip2object: &Mat4) -> Option<Transformation> {
        let start = self.start?;
        let current = point_on_axis(self.axis, &input.device2manip, input.device_point)?;
        let mut delta = translation_local2object(current - start, manip2object);
        if input.modifiers.ctrl {
            delta = snapped_vec3(delta, input.config.grid_size);
        }
        let start = manip2object.transform_point3(start);
        let mut scale = scale_factors(delta, start, self.chosen_extent, input.config.min_scale_extent);
        if input.modifiers.shift {
            scale = Vec3::splat(scale[largest_axis(self.axis)]);
        }
        accept_scale(scale)
    }
}

/// Scale in the screen plane through the pivot
#[derive(Debug, Clone, Default)]
pub struct ScaleFree {
    start: Option<Vec3>,
    chosen_extent: Vec3,
}

impl ScaleFree {
    fn construct(&mut self, input: &DragInput, bounds: &Aabb, pivot2world: &Mat4) {
        self.start = point_on_plane(&input.device2manip, input.device_point);
        self.chosen_extent = chosen_extent(bounds, pivot2world);
    }

    fn transform(&self, input: &DragInput, manip2object: &Mat4) -> Option<Transformation> {
        let start = self.start?;
        let current = point_on_plane(&input.device2manip, input.device_point)?;
        let mut delta = translation_local2object(current - start, manip2object);
        if input.modifiers.ctrl {
            delta = snapped_vec3(delta, input.config.grid_size);
        }
        let start = manip2object.transform_point3(start);
        let mut scale = scale_factors(delta, start, self.chosen_extent, input.config.min_scale_extent);
        if input.modifiers.shift {
            scale = Vec3::splat(scale[largest_axis(scale - Vec3::ONE)]);
        }
        accept_scale(scale)
    }
}

/// Trackball rotation about the pivot
#[derive(Debug, Clone, Default)]
pub struct RotateFree {
    start: Option<Vec3>,
}

impl RotateFree {
    fn construct(&mut self, input: &DragInput) {
        self.start = point_on_sphere(
            &input.device2manip,
            input.device_point,
            input.config.rotate_sphere_radius,
        )
        .and_then(Vec3::try_normalize);
    }

    fn transform(&self, input: &DragInput) -> Option<Transformation> {
        let current = point_on_sphere(
            &input.device2manip,
            input.device_point,
            input.config.rotate_sphere_radius,
        )?
        .try_normalize()?;
        Some(Transformation::Rotate(rotation_between(self.start?, current)))
    }
}

/// Rotation about one axis, optionally snapped to the configured angle
#[derive(Debug, Clone)]
pub struct RotateAxis {
    axis: Vec3,
    start: Option<Vec3>,
}

impl RotateAxis {
    pub fn new(axis: Vec3) -> Self {
        Self {
            axis: axis.normalize_or(Vec3::Z),
            start: None,
        }
    }

    fn sphere_point(&self, input: &DragInput) -> Option<Vec3> {
        let point = point_on_sphere(
            &input.device2manip,
            input.device_point,
            input.config.rotate_sphere_radius,
        )?;
        constrain_to_axis(point, self.axis)
    }

    fn construct(&mut self, input: &DragInput) {
        self.start = self.sphere_point(input);
    }

    fn transform(&self, input: &DragInput) -> Option<Transformation> {
        let current = self.sphere_point(input)?;
        let mut angle = angle_for_axis(self.start?, current, self.axis);
        if input.modifiers.shift {
            angle = snapped(angle, input.config.snap_angle());
        }
        Some(Transformation::Rotate(Quat::from_axis_angle(self.axis, angle)))
    }
}

/// Skew axis `which` against the bounds face on axis `by`
#[derive(Debug, Clone)]
pub struct SkewAxis {
    which: usize,
    by: usize,
    /// 1.0 for the positive face, -1.0 for the negative face
    by_sign: f32,
    start: Option<Vec3>,
    bounds: Aabb,
}

impl SkewAxis {
    pub fn new(which: usize, by: usize, positive: bool) -> Self {
        debug_assert!(which < 3 && by < 3 && which != by, "invalid skew axes");
        Self {
            which,
            by,
            by_sign: if positive { 1.0 } else { -1.0 },
            start: None,
            bounds: Aabb::EMPTY,
        }
    }

    fn construct(&mut self, input: &DragInput, bounds: &Aabb, pivot2world: &Mat4) {
        self.start = point_on_axis(unit_axis(self.which), &input.device2manip, input.device_point);
        self.bounds = bounds_in_pivot_frame(bounds, pivot2world);
    }

    fn transform(&self, input: &DragInput, manip2object: &Mat4) -> Option<Transformation> {
        if !self.bounds.is_valid() {
            return None;
        }
        let current = point_on_axis(unit_axis(self.which), &input.device2manip, input.device_point)?;
        let mut delta = translation_local2object(current - self.start?, manip2object);
        if input.modifiers.ctrl {
            delta = snapped_vec3(delta, input.config.grid_size);
        }
        let by_extent = self.bounds.origin[self.by] + self.bounds.extents[self.by] * self.by_sign;
        if by_extent.abs() < EPSILON {
            return None;
        }
        Some(Transformation::Skew {
            which: self.which,
            by: self.by,
            amount: delta[self.which] / by_extent,
        })
    }
}

/// Resize the selection bounds by moving some of its faces
#[derive(Debug, Clone)]
pub struct DragBounds {
    moving_min: BVec3,
    moving_max: BVec3,
    start: Option<Vec3>,
    bounds: Aabb,
}

impl DragBounds {
    pub fn new(moving_min: BVec3, moving_max: BVec3) -> Self {
        Self {
            moving_min,
            moving_max,
            start: None,
            bounds: Aabb::EMPTY,
        }
    }

    fn construct(&mut self, input: &DragInput, bounds: &Aabb) {
        self.start = point_on_plane(&input.device2manip, input.device_point);
        self.bounds = *bounds;
    }

    fn transform(&self, input: &DragInput, manip2object: &Mat4) -> Option<Transformation> {
        if !self.bounds.is_valid() {
            return None;
        }
        let current = point_on_plane(&input.device2manip, input.device_point)?;
        let delta = translation_local2object(current - self.start?, manip2object);
        let grid = if input.modifiers.ctrl { input.config.grid_size } else { 0.0 };

        let (start_min, start_max) = (self.bounds.min(), self.bounds.max());
        let (mut min, mut max) = (start_min, start_max);
        for i in 0..3 {
            if self.moving_max.test(i) {
                max[i] = snapped(start_max[i] + delta[i], grid).max(start_min[i]);
            }
            if self.moving_min.test(i) {
                min[i] = snapped(start_min[i] + delta[i], grid).min(max[i]);
            }
        }
        Some(Transformation::Bounds {
            start: self.bounds,
            current: Aabb::from_min_max(min, max),
        })
    }
}

/// Sweep out a new box on the screen plane, one brush depth deep
#[derive(Debug, Clone, Default)]
pub struct DragNewBrush {
    start: Option<Vec3>,
    view_direction: Option<Vec3>,
    origin: Vec3,
}

impl DragNewBrush {
    fn construct(&mut self, input: &DragInput, pivot2world: &Mat4) {
        self.start = point_on_plane(&input.device2manip, input.device_point);
        self.view_direction =
            ray_for_device_point(&input.device2manip, input.device_point).map(|ray| ray.direction);
        self.origin = pivot2world.w_axis.truncate();
    }

    fn transform(&self, input: &DragInput, manip2object: &Mat4) -> Option<Transformation> {
        let current = point_on_plane(&input.device2manip, input.device_point)?;
        let start = manip2object.transform_point3(self.start?) + self.origin;
        let current = manip2object.transform_point3(current) + self.origin;
        let direction = manip2object.transform_vector3(self.view_direction?);
        let depth_axis = largest_axis(direction);

        let grid = input.config.grid_size;
        let mut min = snapped_vec3(start.min(current), grid);
        let mut max = snapped_vec3(start.max(current), grid);
        let base = snapped(start[depth_axis], grid);
        let depth = input.config.effective_brush_depth();
        if direction[depth_axis] > 0.0 {
            min[depth_axis] = base;
            max[depth_axis] = base + depth;
        } else {
            min[depth_axis] = base - depth;
            max[depth_axis] = base;
        }

        if (0..3).any(|i| max[i] - min[i] <= EPSILON) {
            return None;
        }
        Some(Transformation::NewBrush(Aabb::from_min_max(min, max)))
    }
}

/// Push one bounds face along its normal
#[derive(Debug, Clone)]
pub struct ExtrudeFaces {
    axis: usize,
    positive: bool,
    start: Option<Vec3>,
}

impl ExtrudeFaces {
    pub fn new(axis: usize, positive: bool) -> Self {
        Self {
            axis,
            positive,
            start: None,
        }
    }

    fn construct(&mut self, input: &DragInput) {
        self.start = point_on_axis(unit_axis(self.axis), &input.device2manip, input.device_point);
    }

    fn transform(&self, input: &DragInput, manip2object: &Mat4) -> Option<Transformation> {
        let current = point_on_axis(unit_axis(self.axis), &input.device2manip, input.device_point)?;
        let delta = translation_local2object(current - self.start?, manip2object);
        let sign = if self.positive { 1.0 } else { -1.0 };
        Some(Transformation::Extrude {
            axis: self.axis,
            positive: self.positive,
            distance: snapped(delta[self.axis] * sign, input.config.grid_size),
        })
    }
}

/// The closed set of drag behaviors
#[derive(Debug, Clone)]
pub enum Manipulatable {
    TranslateFree(TranslateFree),
    TranslateAxis(TranslateAxis),
    ScaleFree(ScaleFree),
    ScaleAxis(ScaleAxis),
    RotateFree(RotateFree),
    RotateAxis(RotateAxis),
    SkewAxis(SkewAxis),
    DragBounds(DragBounds),
    DragNewBrush(DragNewBrush),
    ExtrudeFaces(ExtrudeFaces),
}

impl Manipulatable {
    pub fn name(&self) -> &'static str {
        match self {
            Manipulatable::TranslateFree(_) => "TranslateFree",
            Manipulatable::TranslateAxis(_) => "TranslateAxis",
            Manipulatable::ScaleFree(_) => "ScaleFree",
            Manipulatable::ScaleAxis(_) => "ScaleAxis",
            Manipulatable::RotateFree(_) => "RotateFree",
            Manipulatable::RotateAxis(_) => "RotateAxis",
            Manipulatable::SkewAxis(_) => "SkewAxis",
            Manipulatable::DragBounds(_) => "DragBounds",
            Manipulatable::DragNewBrush(_) => "DragNewBrush",
            Manipulatable::ExtrudeFaces(_) => "ExtrudeFaces",
        }
    }

    /// Capture the drag anchor. Calling again restarts the session.
    ///
    /// `bounds` is the world-space selection bounds and `pivot2world` the
    /// pivot frame at drag start. Scale and skew measure the bounds along the
    /// pivot axes, which may be rotated.
    pub fn construct(&mut self, input: &DragInput, bounds: &Aabb, pivot2world: &Mat4) {
        match self {
            Manipulatable::TranslateFree(m) => m.construct(input, bounds),
            Manipulatable::TranslateAxis(m) => m.construct(input),
            Manipulatable::ScaleFree(m) => m.construct(input, bounds, pivot2world),
            Manipulatable::ScaleAxis(m) => m.construct(input, bounds, pivot2world),
            Manipulatable::RotateFree(m) => m.construct(input),
            Manipulatable::RotateAxis(m) => m.construct(input),
            Manipulatable::SkewAxis(m) => m.construct(input, bounds, pivot2world),
            Manipulatable::DragBounds(m) => m.construct(input, bounds),
            Manipulatable::DragNewBrush(m) => m.construct(input, pivot2world),
            Manipulatable::ExtrudeFaces(m) => m.construct(input),
        }
    }

    /// The transformation from the anchor to the current pointer, or `None`
    /// when the geometry is degenerate for this event
    pub fn transform(&self, input: &DragInput, manip2object: &Mat4) -> Option<Transformation> {
        let transformation = match self {
            Manipulatable::TranslateFree(m) => m.transform(input, manip2object),
            Manipulatable::TranslateAxis(m) => m.transform(input, manip2object),
            Manipulatable::ScaleFree(m) => m.transform(input, manip2object),
            Manipulatable::ScaleAxis(m) => m.transform(input, manip2object),
            Manipulatable::RotateFree(m) => m.transform(input),
            Manipulatable::RotateAxis(m) => m.transform(input),
            Manipulatable::SkewAxis(m) => m.transform(input, manip2object),
            Manipulatable::DragBounds(m) => m.transform(input, manip2object),
            Manipulatable::DragNewBrush(m) => m.transform(input, manip2object),
            Manipulatable::ExtrudeFaces(m) => m.transform(input, manip2object),
        }?;
        transformation.is_finite().then_some(transformation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_grid() -> ManipulatorConfig {
        ManipulatorConfig {
            grid_size: 0.0,
            ..Default::default()
        }
    }

    fn input(device2manip: Mat4, x: f32, y: f32, modifiers: InputModifiers, config: &ManipulatorConfig) -> DragInput<'_> {
        DragInput {
            device2manip,
            device_point: Vec2::new(x, y),
            modifiers,
            config,
        }
    }

    /// Perspective camera at (0, 0, 10) looking at the origin, pixel-ish units
    fn perspective_device2manip() -> Mat4 {
        let projection = Mat4::perspective_rh_gl(1.0, 1.0, 0.1, 100.0);
        let modelview = Mat4::look_at_rh(Vec3::new(3.0, 4.0, 10.0), Vec3::ZERO, Vec3::Y);
        (projection * modelview).inverse()
    }

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::ZERO, Vec3::ONE)
    }

    #[test]
    fn test_transform_does_not_drift() {
        let config = ManipulatorConfig::default();
        let d2m = perspective_device2manip();
        let mut behavior = Manipulatable::TranslateFree(TranslateFree::default());
        behavior.construct(&input(d2m, 0.0, 0.0, InputModifiers::NONE, &config), &unit_box(), &Mat4::IDENTITY);

        let moved = input(d2m, 0.6, -0.3, InputModifiers::NONE, &config);
        let first = behavior.transform(&moved, &Mat4::IDENTITY);
        behavior.transform(&input(d2m, -0.2, 0.4, InputModifiers::NONE, &config), &Mat4::IDENTITY);
        let second = behavior.transform(&moved, &Mat4::IDENTITY);
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_free_translate_follows_pointer() {
        let config = no_grid();
        let d2m = Mat4::from_scale(Vec3::splat(100.0));
        let mut behavior = Manipulatable::TranslateFree(TranslateFree::default());
        behavior.construct(&input(d2m, 0.1, 0.1, InputModifiers::NONE, &config), &unit_box(), &Mat4::IDENTITY);

        let Some(Transformation::Translate(t)) =
            behavior.transform(&input(d2m, 0.4, 0.2, InputModifiers::NONE, &config), &Mat4::IDENTITY)
        else {
            panic!("expected a translation");
        };
        assert!((t - Vec3::new(30.0, 10.0, 0.0)).length() < 1e-3);

        // shift keeps only the dominant axis
        let Some(Transformation::Translate(t)) =
            behavior.transform(&input(d2m, 0.4, 0.2, InputModifiers::SHIFT, &config), &Mat4::IDENTITY)
        else {
            panic!("expected a translation");
        };
        assert!((t - Vec3::new(30.0, 0.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_free_translate_grid_and_bounds_snap() {
        let config = ManipulatorConfig::default();
        let d2m = Mat4::from_scale(Vec3::splat(100.0));
        let bounds = Aabb::from_min_max(Vec3::new(1.0, 0.0, 0.0), Vec3::new(4.0, 8.0, 8.0));
        let mut behavior = Manipulatable::TranslateFree(TranslateFree::default());
        behavior.construct(&input(d2m, 0.0, 0.0, InputModifiers::NONE, &config), &bounds, &Mat4::IDENTITY);

        let Some(Transformation::Translate(t)) =
            behavior.transform(&input(d2m, 0.05, 0.0, InputModifiers::NONE, &config), &Mat4::IDENTITY)
        else {
            panic!("expected a translation");
        };
        assert_eq!(t, Vec3::new(8.0, 0.0, 0.0));

        // ctrl puts the nearer face on the grid: max x 4 + 5 = 9 -> 8
        let Some(Transformation::Translate(t)) =
            behavior.transform(&input(d2m, 0.05, 0.0, InputModifiers::CTRL, &config), &Mat4::IDENTITY)
        else {
            panic!("expected a translation");
        };
        assert!((t.x - 4.0).abs() < 1e-4, "{t}");
        assert!((bounds.max().x + t.x - 8.0).abs() < 1e-4);
    }

    #[test]
    fn test_free_translate_alt_moves_along_z() {
        let config = no_grid();
        let d2m = perspective_device2manip();
        let mut behavior = Manipulatable::TranslateFree(TranslateFree::default());
        behavior.construct(&input(d2m, 0.0, 0.0, InputModifiers::ALT, &config), &unit_box(), &Mat4::IDENTITY);
        let Some(Transformation::Translate(t)) =
            behavior.transform(&input(d2m, 0.1, 0.3, InputModifiers::ALT, &config), &Mat4::IDENTITY)
        else {
            panic!("expected a translation");
        };
        assert_eq!(t.x, 0.0);
        assert_eq!(t.y, 0.0);
        assert!(t.z.abs() > 0.1);
    }

    #[test]
    fn test_axis_translate_stays_on_axis() {
        let config = ManipulatorConfig::default();
        let d2m = perspective_device2manip();
        for (axis, index) in [(Vec3::X, 0), (Vec3::Y, 1), (Vec3::Z, 2)] {
            let mut behavior = Manipulatable::TranslateAxis(TranslateAxis::new(axis));
            behavior.construct(&input(d2m, 0.0, 0.0, InputModifiers::NONE, &config), &unit_box(), &Mat4::IDENTITY);
            let Some(Transformation::Translate(t)) =
                behavior.transform(&input(d2m, 0.5, 0.4, InputModifiers::NONE, &config), &Mat4::IDENTITY)
            else {
                panic!("expected a translation");
            };
            for other in (0..3).filter(|&i| i != index) {
                assert_eq!(t[other], 0.0, "axis {index}: {t}");
            }
        }
    }

    #[test]
    fn test_rotate_snap() {
        let d2m = Mat4::from_scale(Vec3::splat(100.0));
        let config = ManipulatorConfig::default();
        let mut behavior = Manipulatable::RotateAxis(RotateAxis::new(Vec3::Z));
        behavior.construct(&input(d2m, 0.3, 0.0, InputModifiers::NONE, &config), &unit_box(), &Mat4::IDENTITY);

        let degrees = 40.0_f32.to_radians();
        let (x, y) = (0.3 * degrees.cos(), 0.3 * degrees.sin());

        let Some(Transformation::Rotate(free)) =
            behavior.transform(&input(d2m, x, y, InputModifiers::NONE, &config), &Mat4::IDENTITY)
        else {
            panic!("expected a rotation");
        };
        let (axis, angle) = free.to_axis_angle();
        assert!((axis - Vec3::Z).length() < 1e-4);
        assert!((angle.to_degrees() - 40.0).abs() < 1e-2);

        let Some(Transformation::Rotate(snap)) =
            behavior.transform(&input(d2m, x, y, InputModifiers::SHIFT, &config), &Mat4::IDENTITY)
        else {
            panic!("expected a rotation");
        };
        let angle = snap.to_axis_angle().1.to_degrees();
        assert!((angle / 15.0 - (angle / 15.0).round()).abs() < 1e-3);
        assert!((angle - 45.0).abs() < 1e-2);
    }

    #[test]
    fn test_rotate_axis_sign() {
        let d2m = Mat4::from_scale(Vec3::splat(100.0));
        let config = ManipulatorConfig::default();
        let mut behavior = Manipulatable::RotateAxis(RotateAxis::new(Vec3::Z));
        behavior.construct(&input(d2m, 0.0, 0.3, InputModifiers::NONE, &config), &unit_box(), &Mat4::IDENTITY);
        let Some(Transformation::Rotate(q)) =
            behavior.transform(&input(d2m, 0.3, 0.0, InputModifiers::NONE, &config), &Mat4::IDENTITY)
        else {
            panic!("expected a rotation");
        };
        // Y toward X is clockwise around +Z
        assert!((q * Vec3::Y - Vec3::X).length() < 1e-4);
    }

    #[test]
    fn test_free_rotate() {
        let d2m = Mat4::from_scale(Vec3::splat(100.0));
        let config = ManipulatorConfig::default();
        let mut behavior = Manipulatable::RotateFree(RotateFree::default());
        behavior.construct(&input(d2m, 0.0, 0.0, InputModifiers::NONE, &config), &unit_box(), &Mat4::IDENTITY);
        let Some(Transformation::Rotate(q)) =
            behavior.transform(&input(d2m, 0.2, 0.0, InputModifiers::NONE, &config), &Mat4::IDENTITY)
        else {
            panic!("expected a rotation");
        };
        let (axis, angle) = q.to_axis_angle();
        assert!(axis.y.abs() > 0.99);
        assert!(angle > 0.1);
    }

    #[test]
    fn test_unit_box_scale_x_doubles() {
        let config = ManipulatorConfig::default();
        let d2m = Mat4::IDENTITY;
        let mut behavior = Manipulatable::ScaleAxis(ScaleAxis::new(Vec3::X));
        behavior.construct(&input(d2m, 1.0, 0.0, InputModifiers::NONE, &config), &unit_box(), &Mat4::IDENTITY);
        let Some(Transformation::Scale(scale)) =
            behavior.transform(&input(d2m, 2.0, 0.0, InputModifiers::NONE, &config), &Mat4::IDENTITY)
        else {
            panic!("expected a scale");
        };
        assert!((scale.x - 2.0).abs() < 1e-5);
        assert_eq!(scale.y, 1.0);
        assert_eq!(scale.z, 1.0);

        let Some(Transformation::Scale(uniform)) =
            behavior.transform(&input(d2m, 2.0, 0.0, InputModifiers::SHIFT, &config), &Mat4::IDENTITY)
        else {
            panic!("expected a scale");
        };
        assert!((uniform - Vec3::splat(2.0)).length() < 1e-5);
    }

    #[test]
    fn test_scale_measures_bounds_along_rotated_pivot_axes() {
        let config = ManipulatorConfig::default();
        let d2m = Mat4::IDENTITY;
        // 20 x 80 x 20 in world, turned a quarter so local x runs along world y
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(10.0, 40.0, 10.0));
        let pivot2world = Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let mut behavior = Manipulatable::ScaleAxis(ScaleAxis::new(Vec3::X));
        behavior.construct(&input(d2m, 40.0, 0.0, InputModifiers::NONE, &config), &bounds, &pivot2world);
        let Some(Transformation::Scale(scale)) =
            behavior.transform(&input(d2m, 80.0, 0.0, InputModifiers::NONE, &config), &Mat4::IDENTITY)
        else {
            panic!("expected a scale");
        };
        assert!((scale - Vec3::new(2.0, 1.0, 1.0)).length() < 1e-4, "{scale:?}");

        let mut free = Manipulatable::ScaleFree(ScaleFree::default());
        free.construct(&input(d2m, 40.0, 10.0, InputModifiers::NONE, &config), &bounds, &pivot2world);
        let Some(Transformation::Scale(scale)) =
            free.transform(&input(d2m, 80.0, 20.0, InputModifiers::NONE, &config), &Mat4::IDENTITY)
        else {
            panic!("expected a scale");
        };
        assert!((scale - Vec3::new(2.0, 2.0, 1.0)).length() < 1e-4, "{scale:?}");
    }

    #[test]
    fn test_scale_guard_stays_finite() {
        let config = ManipulatorConfig::default();
        let d2m = Mat4::IDENTITY;
        let flat = Aabb::new(Vec3::ZERO, Vec3::new(0.0, 1.0, 1.0));
        for bounds in [flat, Aabb::EMPTY] {
            let mut behavior = Manipulatable::ScaleAxis(ScaleAxis::new(Vec3::X));
            // start exactly at the pivot: no point-relative reference either
            behavior.construct(&input(d2m, 0.0, 0.0, InputModifiers::NONE, &config), &bounds, &Mat4::IDENTITY);
            let result = behavior.transform(&input(d2m, 0.5, 0.0, InputModifiers::NONE, &config), &Mat4::IDENTITY);
            match result {
                Some(Transformation::Scale(scale)) => assert!(scale.is_finite()),
                None => {}
                other => panic!("unexpected {other:?}"),
            }
        }

        // thin box falls back to the start point
        let mut behavior = Manipulatable::ScaleAxis(ScaleAxis::new(Vec3::X));
        behavior.construct(&input(d2m, 0.5, 0.0, InputModifiers::NONE, &config), &flat, &Mat4::IDENTITY);
        let Some(Transformation::Scale(scale)) =
            behavior.transform(&input(d2m, 1.0, 0.0, InputModifiers::NONE, &config), &Mat4::IDENTITY)
        else {
            panic!("expected a scale");
        };
        assert!((scale.x - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_free_scale_uniform() {
        let config = no_grid();
        let d2m = Mat4::IDENTITY;
        let bounds = Aabb::new(Vec3::ZERO, Vec3::splat(0.5));
        let mut behavior = Manipulatable::ScaleFree(ScaleFree::default());
        behavior.construct(&input(d2m, 0.5, 0.5, InputModifiers::NONE, &config), &bounds, &Mat4::IDENTITY);
        let Some(Transformation::Scale(scale)) =
            behavior.transform(&input(d2m, 1.0, 0.75, InputModifiers::NONE, &config), &Mat4::IDENTITY)
        else {
            panic!("expected a scale");
        };
        assert!((scale - Vec3::new(2.0, 1.5, 1.0)).length() < 1e-5);

        let Some(Transformation::Scale(scale)) =
            behavior.transform(&input(d2m, 1.0, 0.75, InputModifiers::SHIFT, &config), &Mat4::IDENTITY)
        else {
            panic!("expected a scale");
        };
        assert!((scale - Vec3::splat(2.0)).length() < 1e-5);
    }

    #[test]
    fn test_skew_amount() {
        let config = no_grid();
        let d2m = Mat4::IDENTITY;
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(1.0, 2.0, 1.0));
        let mut behavior = Manipulatable::SkewAxis(SkewAxis::new(0, 1, true));
        behavior.construct(&input(d2m, 0.0, 0.5, InputModifiers::NONE, &config), &bounds, &Mat4::IDENTITY);
        let result = behavior.transform(&input(d2m, 0.5, 0.5, InputModifiers::NONE, &config), &Mat4::IDENTITY);
        assert_eq!(
            result,
            Some(Transformation::Skew {
                which: 0,
                by: 1,
                amount: 0.25
            })
        );

        let mut flat = Manipulatable::SkewAxis(SkewAxis::new(0, 1, true));
        let thin = Aabb::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0));
        flat.construct(&input(d2m, 0.0, 0.0, InputModifiers::NONE, &config), &thin, &Mat4::IDENTITY);
        assert!(flat.transform(&input(d2m, 0.5, 0.0, InputModifiers::NONE, &config), &Mat4::IDENTITY).is_none());
    }

    #[test]
    fn test_drag_bounds_moves_selected_faces() {
        let config = ManipulatorConfig::default();
        let d2m = Mat4::from_scale(Vec3::splat(100.0));
        let bounds = Aabb::from_min_max(Vec3::ZERO, Vec3::splat(16.0));
        let mut behavior = Manipulatable::DragBounds(DragBounds::new(BVec3::FALSE, BVec3::new(true, false, false)));
        behavior.construct(&input(d2m, 0.0, 0.0, InputModifiers::NONE, &config), &bounds, &Mat4::IDENTITY);

        let Some(Transformation::Bounds { start, current }) =
            behavior.transform(&input(d2m, 0.05, 0.05, InputModifiers::CTRL, &config), &Mat4::IDENTITY)
        else {
            panic!("expected bounds");
        };
        assert_eq!(start, bounds);
        // 16 + 5 snapped to the 8 grid
        assert_eq!(current.max(), Vec3::new(24.0, 16.0, 16.0));
        assert_eq!(current.min(), Vec3::ZERO);

        // dragging past the opposite face collapses instead of inverting
        let Some(Transformation::Bounds { current, .. }) =
            behavior.transform(&input(d2m, -0.5, 0.0, InputModifiers::NONE, &config), &Mat4::IDENTITY)
        else {
            panic!("expected bounds");
        };
        assert_eq!(current.max().x, 0.0);
    }

    #[test]
    fn test_new_brush() {
        let config = ManipulatorConfig::default();
        let d2m = Mat4::from_scale(Vec3::splat(100.0));
        let mut behavior = Manipulatable::DragNewBrush(DragNewBrush::default());
        behavior.construct(&input(d2m, 0.01, 0.01, InputModifiers::NONE, &config), &Aabb::EMPTY, &Mat4::IDENTITY);

        let Some(Transformation::NewBrush(brush)) =
            behavior.transform(&input(d2m, 0.31, 0.17, InputModifiers::NONE, &config), &Mat4::IDENTITY)
        else {
            panic!("expected a brush");
        };
        assert_eq!(brush.min(), Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(brush.max(), Vec3::new(32.0, 16.0, 8.0));

        // no area on screen yet
        assert!(
            behavior
                .transform(&input(d2m, 0.02, 0.01, InputModifiers::NONE, &config), &Mat4::IDENTITY)
                .is_none()
        );
    }

    #[test]
    fn test_extrude_distance() {
        let config = ManipulatorConfig::default();
        let d2m = Mat4::from_scale(Vec3::splat(100.0));
        let mut behavior = Manipulatable::ExtrudeFaces(ExtrudeFaces::new(0, false));
        behavior.construct(&input(d2m, 0.0, 0.0, InputModifiers::NONE, &config), &Aabb::EMPTY, &Mat4::IDENTITY);
        let result = behavior.transform(&input(d2m, -0.15, 0.3, InputModifiers::NONE, &config), &Mat4::IDENTITY);
        assert_eq!(
            result,
            Some(Transformation::Extrude {
                axis: 0,
                positive: false,
                distance: 16.0
            })
        );
    }
}
