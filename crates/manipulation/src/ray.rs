//! Pointer rays and the anchor points drag behaviors measure against.
//!
//! Every function takes a `device2manip` matrix that maps normalized device
//! coordinates (with clip depth in `[-1, 1]`) into manipulation space, and
//! returns `None` when the geometry is degenerate for this pointer position.

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

/// Epsilon for floating point comparisons
const EPSILON: f32 = 1e-6;

/// A ray with a unit direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Parameter of the point on the ray closest to `point`
    pub fn closest_parameter(&self, point: Vec3) -> f32 {
        (point - self.origin).dot(self.direction)
    }
}

/// Ray from the near plane to the far plane through a device point.
///
/// # Arguments
/// * `device2manip` - Inverse of the manipulation-to-device transform
/// * `device_point` - Pointer position in device space
///
/// # Returns
/// `None` when either end fails to unproject or the two ends coincide
pub fn ray_for_device_point(device2manip: &Mat4, device_point: Vec2) -> Option<Ray> {
    let near = unproject(device2manip, device_point.extend(-1.0))?;
    let far = unproject(device2manip, device_point.extend(1.0))?;
    let direction = (far - near).try_normalize()?;
    Some(Ray {
        origin: near,
        direction,
    })
}

fn unproject(device2manip: &Mat4, device: Vec3) -> Option<Vec3> {
    let homogeneous = *device2manip * device.extend(1.0);
    if homogeneous.w.abs() < EPSILON {
        return None;
    }
    let point = homogeneous.truncate() / homogeneous.w;
    point.is_finite().then_some(point)
}

/// Point under the pointer on the screen-parallel plane through the
/// manipulation origin
pub fn point_on_plane(device2manip: &Mat4, device_point: Vec2) -> Option<Vec3> {
    let manip2device = device2manip.inverse();
    let pivot = manip2device * Vec4::W;
    if pivot.w.abs() < EPSILON {
        return None;
    }
    let depth = pivot.z / pivot.w;
    unproject(device2manip, device_point.extend(depth))
}

/// Point on the line through the origin along `axis` closest to the pointer
/// ray. `None` when the ray is parallel to the axis.
pub fn point_on_axis(axis: Vec3, device2manip: &Mat4, device_point: Vec2) -> Option<Vec3> {
    let axis = axis.try_normalize()?;
    let ray = ray_for_device_point(device2manip, device_point)?;
    let b = axis.dot(ray.direction);
    let denominator = 1.0 - b * b;
    if denominator < EPSILON {
        return None;
    }
    let t = (axis.dot(ray.origin) - b * ray.direction.dot(ray.origin)) / denominator;
    let point = axis * t;
    point.is_finite().then_some(point)
}

/// Point where the pointer ray enters the sphere of `radius` at the origin.
/// A ray that misses yields its closest approach to the centre, which lies
/// on the plane through the origin orthogonal to the view.
pub fn point_on_sphere(device2manip: &Mat4, device_point: Vec2, radius: f32) -> Option<Vec3> {
    let ray = ray_for_device_point(device2manip, device_point)?;
    let closest = ray.at(ray.closest_parameter(Vec3::ZERO));
    let distance_squared = closest.length_squared();
    let radius_squared = radius * radius;
    let point = if distance_squared < radius_squared {
        closest - ray.direction * (radius_squared - distance_squared).sqrt()
    } else {
        closest
    };
    point.is_finite().then_some(point)
}

/// Remove the component along `axis` and normalize
pub fn constrain_to_axis(vector: Vec3, axis: Vec3) -> Option<Vec3> {
    (vector - axis * vector.dot(axis)).try_normalize()
}

/// Unsigned angle between two vectors, stable for small and large angles
pub fn angle_between(a: Vec3, b: Vec3) -> f32 {
    2.0 * (a - b).length().atan2((a + b).length())
}

/// Angle from `a` to `b`, positive when counter-clockwise around `axis`
pub fn angle_for_axis(a: Vec3, b: Vec3, axis: Vec3) -> f32 {
    let angle = angle_between(a, b);
    if axis.dot(a.cross(b)) > 0.0 {
        angle
    } else {
        -angle
    }
}

/// Shortest-arc rotation between two unit vectors
pub fn rotation_between(start: Vec3, current: Vec3) -> Quat {
    Quat::from_rotation_arc(start, current)
}

/// Convert a manipulation-space displacement into object space
pub fn translation_local2object(local: Vec3, manip2object: &Mat4) -> Vec3 {
    manip2object.transform_point3(local) - manip2object.transform_point3(Vec3::ZERO)
}

/// Round to the nearest multiple of `step`; a non-positive step disables snapping
pub fn snapped(value: f32, step: f32) -> f32 {
    if step > 0.0 {
        (value / step).round() * step
    } else {
        value
    }
}

pub fn snapped_vec3(value: Vec3, step: f32) -> Vec3 {
    Vec3::new(snapped(value.x, step), snapped(value.y, step), snapped(value.z, step))
}

/// Index of the component with the largest magnitude
pub fn largest_axis(vector: Vec3) -> usize {
    let abs = vector.abs();
    if abs.x >= abs.y && abs.x >= abs.z {
        0
    } else if abs.y >= abs.z {
        1
    } else {
        2
    }
}

/// Unit vector along axis `index`
pub fn unit_axis(index: usize) -> Vec3 {
    match index {
        0 => Vec3::X,
        1 => Vec3::Y,
        _ => Vec3::Z,
    }
}
