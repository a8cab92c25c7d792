//! Placement frames for manipulator handles.
//!
//! Handles are modelled in manipulation units, which are scaled so one unit
//! spans about one pixel at the pivot. [`Pivot2World`] holds the three frames
//! that map manipulation units into world space, plus the direction toward
//! the viewer in pivot-local coordinates.

use glam::{Mat4, Vec3};
use selection::View;

/// Smallest clip w accepted for a pivot in front of the camera
const MIN_PIVOT_W: f32 = 1e-6;

/// Shortest screen-space column accepted when scaling the pivot
const MIN_AXIS_SCALE: f32 = 1e-9;

/// Pivot to window-pixel transform, before the perspective divide
pub fn pivot2screen(pivot2world: &Mat4, view: &View) -> Mat4 {
    view.viewport() * view.projection() * view.modelview() * *pivot2world
}

/// Scale that makes each pivot axis one pixel long at unit clip w
pub fn pivot_scale(pivot2screen: &Mat4) -> Option<Mat4> {
    let lengths = Vec3::new(
        pivot2screen.x_axis.truncate().length(),
        pivot2screen.y_axis.truncate().length(),
        pivot2screen.z_axis.truncate().length(),
    );
    if !(lengths.min_element() > MIN_AXIS_SCALE) || !lengths.is_finite() {
        return None;
    }
    Some(Mat4::from_scale(lengths.recip()))
}

/// Scale by the pivot's clip w so handles keep their pixel size with distance
pub fn pivot_perspective(pivot2screen: &Mat4) -> Option<Mat4> {
    let w = pivot2screen.w_axis.w;
    (w > MIN_PIVOT_W && w.is_finite()).then(|| Mat4::from_scale(Vec3::splat(w)))
}

/// Manipulation-to-world transform for a frame placed at `pivot2world`
pub fn manip2world(pivot2world: &Mat4, view: &View) -> Option<Mat4> {
    let screen = pivot2screen(pivot2world, view);
    let frame = *pivot2world * pivot_scale(&screen)? * pivot_perspective(&screen)?;
    frame.is_finite().then_some(frame)
}

/// Maps device points into the manipulation space of a pivot
pub fn construct_device2manip(pivot2world: &Mat4, view: &View) -> Option<Mat4> {
    let manip2device = view.projection() * view.modelview() * manip2world(pivot2world, view)?;
    if manip2device.determinant() == 0.0 {
        return None;
    }
    let device2manip = manip2device.inverse();
    device2manip.is_finite().then_some(device2manip)
}

/// Maps manipulation space into pivot-local object space
pub fn construct_manip2object(pivot2world: &Mat4, view: &View) -> Option<Mat4> {
    let manip2object = pivot2world.inverse() * manip2world(pivot2world, view)?;
    manip2object.is_finite().then_some(manip2object)
}

/// Unit direction from `origin` toward the viewer, in world space
fn toward_viewer(origin: Vec3, view: &View) -> Vec3 {
    let camera2world = view.modelview().inverse();
    let back = camera2world.z_axis.truncate().normalize_or(Vec3::Z);
    if view.is_perspective() {
        (camera2world.w_axis.truncate() - origin).normalize_or(back)
    } else {
        back
    }
}

/// Pivot turned to face the viewer, keeping the camera's up as reference
pub fn billboard_viewpoint_oriented(pivot2world: &Mat4, view: &View) -> Mat4 {
    let origin = pivot2world.w_axis.truncate();
    let camera2world = view.modelview().inverse();
    let forward = toward_viewer(origin, view);
    let up = camera2world.y_axis.truncate();
    let x = up
        .cross(forward)
        .try_normalize()
        .unwrap_or_else(|| camera2world.x_axis.truncate().normalize_or(Vec3::X));
    let y = forward.cross(x);
    Mat4::from_cols(
        x.extend(0.0),
        y.extend(0.0),
        forward.extend(0.0),
        origin.extend(1.0),
    )
}

/// Pivot aligned with the camera's image plane
pub fn billboard_viewplane_oriented(pivot2world: &Mat4, view: &View) -> Mat4 {
    let origin = pivot2world.w_axis.truncate();
    let camera2world = view.modelview().inverse();
    let x = camera2world.x_axis.truncate().normalize_or(Vec3::X);
    let y = camera2world.y_axis.truncate().normalize_or(Vec3::Y);
    let z = camera2world.z_axis.truncate().normalize_or(Vec3::Z);
    Mat4::from_cols(x.extend(0.0), y.extend(0.0), z.extend(0.0), origin.extend(1.0))
}

/// Frames derived from a pivot and the current camera.
///
/// Rebuilt for every pick and drag event; never cached across a change of
/// pivot or view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pivot2World {
    /// The pivot itself, in world units
    pub pivot2world: Mat4,
    /// Pivot axes, scaled to manipulation units
    pub world_space: Mat4,
    /// Z axis points at the viewer
    pub viewpoint_space: Mat4,
    /// Axes follow the camera's image plane
    pub viewplane_space: Mat4,
    /// Direction toward the viewer in pivot-local coordinates
    pub axis_screen: Vec3,
}

impl Pivot2World {
    /// `None` when the pivot is behind the camera or the view is degenerate
    pub fn new(pivot2world: Mat4, view: &View) -> Option<Self> {
        let world_space = manip2world(&pivot2world, view)?;
        let viewpoint = billboard_viewpoint_oriented(&pivot2world, view);
        let viewpoint_space = manip2world(&viewpoint, view)?;
        let viewplane_space = manip2world(&billboard_viewplane_oriented(&pivot2world, view), view)?;
        let axis_screen = pivot2world
            .inverse()
            .transform_vector3(viewpoint.z_axis.truncate())
            .try_normalize()?;
        Some(Self {
            pivot2world,
            world_space,
            viewpoint_space,
            viewplane_space,
            axis_screen,
        })
    }

    /// False when `axis` points too directly at the viewer to be dragged
    pub fn show_axis(&self, axis: Vec3, threshold: f32) -> bool {
        self.axis_screen.dot(axis).abs() < threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec2};

    fn pixel_ortho_view() -> View {
        let projection = Mat4::orthographic_rh_gl(-320.0, 320.0, -240.0, 240.0, -1000.0, 1000.0);
        View::for_window(Mat4::IDENTITY, projection, 640, 480, true)
    }

    fn perspective_view() -> View {
        let projection = Mat4::perspective_rh_gl(1.0, 640.0 / 480.0, 0.1, 1000.0);
        View::for_window(Mat4::IDENTITY, projection, 640, 480, true)
    }

    fn pixels(view: &View, device: Vec3) -> Vec2 {
        let viewport = view.viewport();
        Vec2::new(device.x * viewport.x_axis.x, device.y * viewport.y_axis.y)
    }

    #[test]
    fn test_ortho_pixel_units() {
        let view = pixel_ortho_view();
        let frame = manip2world(&Mat4::IDENTITY, &view).unwrap();
        for axis in [frame.x_axis, frame.y_axis, frame.z_axis] {
            assert!((axis.truncate().length() - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_perspective_handle_is_one_pixel_per_unit() {
        let view = perspective_view();
        for depth in [-5.0, -50.0] {
            let pivot = Mat4::from_translation(Vec3::new(1.0, 0.5, depth));
            let device2manip = construct_device2manip(&pivot, &view).unwrap();
            let manip2device = device2manip.inverse();
            let origin = manip2device.project_point3(Vec3::ZERO);
            let unit = manip2device.project_point3(Vec3::new(10.0, 0.0, 0.0));
            let shift = pixels(&view, unit - origin);
            assert!((shift.x - 10.0).abs() < 0.1, "depth {depth}: {shift}");
        }
    }

    #[test]
    fn test_pivot_behind_camera() {
        let view = perspective_view();
        let pivot = Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0));
        assert!(Pivot2World::new(pivot, &view).is_none());
        assert!(construct_device2manip(&pivot, &view).is_none());
    }

    #[test]
    fn test_axis_screen_and_hidden_axes() {
        let view = pixel_ortho_view();
        let frames = Pivot2World::new(Mat4::IDENTITY, &view).unwrap();
        assert!((frames.axis_screen - Vec3::Z).length() < 1e-5);
        assert!(frames.show_axis(Vec3::X, 0.95));
        assert!(!frames.show_axis(Vec3::Z, 0.95));

        // rotated pivot: viewer direction expressed in pivot axes
        let rotated = Mat4::from_quat(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        let frames = Pivot2World::new(rotated, &view).unwrap();
        assert!((frames.axis_screen - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn test_viewpoint_faces_viewer() {
        let view = perspective_view();
        let pivot = Mat4::from_translation(Vec3::new(3.0, 0.0, -10.0));
        let frame = billboard_viewpoint_oriented(&pivot, &view);
        let toward_eye = (Vec3::ZERO - Vec3::new(3.0, 0.0, -10.0)).normalize();
        assert!((frame.z_axis.truncate() - toward_eye).length() < 1e-5);
        assert!(frame.x_axis.truncate().dot(frame.z_axis.truncate()).abs() < 1e-5);
        assert!(frame.y_axis.y > 0.9);
    }

    #[test]
    fn test_manip2object_is_pure_scale() {
        let view = pixel_ortho_view();
        let pivot = Mat4::from_translation(Vec3::new(20.0, 10.0, 0.0));
        let manip2object = construct_manip2object(&pivot, &view).unwrap();
        assert!(manip2object.transform_point3(Vec3::ZERO).length() < 1e-4);
        assert!((manip2object.transform_vector3(Vec3::X) - Vec3::X).length() < 1e-3);
    }
}
