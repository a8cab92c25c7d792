//! Homogeneous clipping against the clip box `-w <= x, y, z <= w`.

use glam::{Mat4, Vec3, Vec4};

/// The six clip planes as coefficients; a point is inside when `dot >= 0`.
const CLIP_PLANES: [Vec4; 6] = [
    Vec4::new(1.0, 0.0, 0.0, 1.0),
    Vec4::new(-1.0, 0.0, 0.0, 1.0),
    Vec4::new(0.0, 1.0, 0.0, 1.0),
    Vec4::new(0.0, -1.0, 0.0, 1.0),
    Vec4::new(0.0, 0.0, 1.0, 1.0),
    Vec4::new(0.0, 0.0, -1.0, 1.0),
];

/// Transform a local point into clip space; `None` if outside the clip box
pub fn clip_point(local2clip: &Mat4, point: Vec3) -> Option<Vec4> {
    let clipped = *local2clip * point.extend(1.0);
    CLIP_PLANES
        .iter()
        .all(|plane| plane.dot(clipped) >= 0.0)
        .then_some(clipped)
}

/// Clip a segment; returns the surviving endpoints
pub fn clip_line(local2clip: &Mat4, a: Vec3, b: Vec3) -> Option<[Vec4; 2]> {
    let mut p0 = *local2clip * a.extend(1.0);
    let mut p1 = *local2clip * b.extend(1.0);
    for plane in &CLIP_PLANES {
        let d0 = plane.dot(p0);
        let d1 = plane.dot(p1);
        match (d0 >= 0.0, d1 >= 0.0) {
            (true, true) => {}
            (false, false) => return None,
            (true, false) => p1 = p0 + (p1 - p0) * (d0 / (d0 - d1)),
            (false, true) => p0 = p0 + (p1 - p0) * (d0 / (d0 - d1)),
        }
    }
    Some([p0, p1])
}

/// Clip a convex polygon (Sutherland-Hodgman). Results with fewer than three
/// vertices are dropped.
pub fn clip_polygon(local2clip: &Mat4, vertices: &[Vec3]) -> Option<Vec<Vec4>> {
    let mut input: Vec<Vec4> = vertices
        .iter()
        .map(|v| *local2clip * v.extend(1.0))
        .collect();
    let mut output = Vec::with_capacity(input.len() + CLIP_PLANES.len());

    for plane in &CLIP_PLANES {
        output.clear();
        let Some(&last) = input.last() else {
            return None;
        };
        let mut previous = last;
        let mut previous_distance = plane.dot(previous);
        for &current in &input {
            let distance = plane.dot(current);
            if distance >= 0.0 {
                if previous_distance < 0.0 {
                    let t = previous_distance / (previous_distance - distance);
                    output.push(previous + (current - previous) * t);
                }
                output.push(current);
            } else if previous_distance >= 0.0 {
                let t = previous_distance / (previous_distance - distance);
                output.push(previous + (current - previous) * t);
            }
            previous = current;
            previous_distance = distance;
        }
        std::mem::swap(&mut input, &mut output);
    }

    (input.len() >= 3).then_some(input)
}

/// Perspective divide. `None` when w is not positive.
pub fn project(clipped: Vec4) -> Option<Vec3> {
    (clipped.w > f32::EPSILON).then(|| clipped.truncate() / clipped.w)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_inside_and_outside() {
        assert!(clip_point(&Mat4::IDENTITY, Vec3::new(0.5, -0.5, 0.0)).is_some());
        assert!(clip_point(&Mat4::IDENTITY, Vec3::new(1.5, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_line_clipped_to_box() {
        let [a, b] = clip_line(&Mat4::IDENTITY, Vec3::new(-3.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0))
            .unwrap();
        assert!((a.x + 1.0).abs() < 1e-6);
        assert!((b.x - 1.0).abs() < 1e-6);
        assert!(clip_line(&Mat4::IDENTITY, Vec3::new(2.0, 2.0, 0.0), Vec3::new(3.0, 2.0, 0.0)).is_none());
    }

    #[test]
    fn test_polygon_clipping() {
        let big = [
            Vec3::new(-2.0, -2.0, 0.0),
            Vec3::new(2.0, -2.0, 0.0),
            Vec3::new(2.0, 2.0, 0.0),
            Vec3::new(-2.0, 2.0, 0.0),
        ];
        let clipped = clip_polygon(&Mat4::IDENTITY, &big).unwrap();
        assert_eq!(clipped.len(), 4);
        for v in clipped {
            assert!(v.x.abs() <= 1.0 + 1e-6 && v.y.abs() <= 1.0 + 1e-6);
        }

        let outside = [
            Vec3::new(2.0, 2.0, 0.0),
            Vec3::new(3.0, 2.0, 0.0),
            Vec3::new(3.0, 3.0, 0.0),
        ];
        assert!(clip_polygon(&Mat4::IDENTITY, &outside).is_none());
    }

    #[test]
    fn test_project() {
        assert_eq!(project(Vec4::new(1.0, 2.0, 3.0, 2.0)), Some(Vec3::new(0.5, 1.0, 1.5)));
        assert_eq!(project(Vec4::new(1.0, 2.0, 3.0, 0.0)), None);
    }
}
