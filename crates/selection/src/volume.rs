//! Hit testing of world-space primitives against a scissored view.
//!
//! After [`SelectionVolume::begin_mesh`] every primitive is transformed into
//! the scissored clip space, clipped to the pick box and measured relative to
//! the pointer, which sits at the device-space origin.

use glam::{Mat4, Vec2, Vec3};

use crate::aabb::Aabb;
use crate::clip::{clip_line, clip_point, clip_polygon, project};
use crate::intersection::{IntersectionBands, SelectionIntersection};
use crate::view::View;

/// Polygons whose normal z is below this are treated as edge-on
const EDGE_ON_EPSILON: f32 = 1e-6;

/// Polygons whose normal is shorter than this have no area
const ZERO_AREA_EPSILON: f32 = 1e-12;

/// Which screen-space winding is discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    #[default]
    None,
    /// Discard polygons that appear clockwise on screen
    Clockwise,
    /// Discard polygons that appear counter-clockwise on screen
    CounterClockwise,
}

/// Primitive tester bound to one scissored view
#[derive(Debug, Clone)]
pub struct SelectionVolume {
    view: View,
    bands: IntersectionBands,
    local2view: Mat4,
    cull: CullMode,
    near: Vec3,
    far: Vec3,
}

impl SelectionVolume {
    pub fn new(view: &View, bands: IntersectionBands) -> Self {
        let mut volume = Self {
            view: *view,
            bands,
            local2view: view.view_matrix(),
            cull: CullMode::None,
            near: Vec3::ZERO,
            far: Vec3::ZERO,
        };
        volume.begin_mesh(Mat4::IDENTITY, false);
        volume
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn bands(&self) -> &IntersectionBands {
        &self.bands
    }

    pub fn cull_mode(&self) -> CullMode {
        self.cull
    }

    /// Start testing an object placed by `local_to_world`. Two-sided geometry
    /// in a wireframe view is never culled.
    pub fn begin_mesh(&mut self, local_to_world: Mat4, two_sided: bool) {
        self.local2view = self.view.view_matrix() * local_to_world;
        self.cull = if two_sided && !self.view.fill() {
            CullMode::None
        } else if local_to_world.determinant() >= 0.0 {
            CullMode::Clockwise
        } else {
            CullMode::CounterClockwise
        };

        let screen2local = self.local2view.inverse();
        self.near = screen2local.project_point3(Vec3::new(0.0, 0.0, -1.0));
        self.far = screen2local.project_point3(Vec3::new(0.0, 0.0, 1.0));
    }

    /// Pointer line at the near plane, in local space
    pub fn near(&self) -> Vec3 {
        self.near
    }

    /// Pointer line at the far plane, in local space
    pub fn far(&self) -> Vec3 {
        self.far
    }

    pub fn test_point(&self, point: Vec3, best: &mut SelectionIntersection) {
        let Some(clipped) = clip_point(&self.local2view, point) else {
            return;
        };
        let Some(p) = project(clipped) else {
            return;
        };
        let hit = SelectionIntersection::new(p.z, p.truncate().length_squared());
        best.assign_if_closer(hit, &self.bands);
    }

    pub fn test_points(&self, points: &[Vec3], best: &mut SelectionIntersection) {
        for &point in points {
            self.test_point(point, best);
        }
    }

    pub fn test_segment(&self, a: Vec3, b: Vec3, best: &mut SelectionIntersection) {
        let Some([p0, p1]) = clip_line(&self.local2view, a, b) else {
            return;
        };
        let (Some(p0), Some(p1)) = (project(p0), project(p1)) else {
            return;
        };
        best.assign_if_closer(segment_intersection(p0, p1), &self.bands);
    }

    /// Independent segments from consecutive vertex pairs
    pub fn test_lines(&self, vertices: &[Vec3], best: &mut SelectionIntersection) {
        for pair in vertices.chunks_exact(2) {
            self.test_segment(pair[0], pair[1], best);
        }
    }

    pub fn test_line_strip(&self, vertices: &[Vec3], best: &mut SelectionIntersection) {
        for pair in vertices.windows(2) {
            self.test_segment(pair[0], pair[1], best);
        }
    }

    pub fn test_line_loop(&self, vertices: &[Vec3], best: &mut SelectionIntersection) {
        self.test_line_strip(vertices, best);
        if vertices.len() > 2 {
            self.test_segment(vertices[vertices.len() - 1], vertices[0], best);
        }
    }

    /// A single convex polygon
    pub fn test_polygon(&self, vertices: &[Vec3], best: &mut SelectionIntersection) {
        if vertices.len() < 3 {
            return;
        }
        let Some(clipped) = clip_polygon(&self.local2view, vertices) else {
            return;
        };
        let Some(projected) = clipped.into_iter().map(project).collect::<Option<Vec<_>>>() else {
            return;
        };
        if let Some(hit) = polygon_intersection(&projected, self.cull) {
            best.assign_if_closer(hit, &self.bands);
        }
    }

    pub fn test_triangles(&self, vertices: &[Vec3], indices: &[u32], best: &mut SelectionIntersection) {
        for tri in indices.chunks_exact(3) {
            if let Some(polygon) = gather(vertices, tri) {
                self.test_polygon(&polygon, best);
            }
        }
    }

    pub fn test_quads(&self, vertices: &[Vec3], indices: &[u32], best: &mut SelectionIntersection) {
        for quad in indices.chunks_exact(4) {
            if let Some(polygon) = gather(vertices, quad) {
                self.test_polygon(&polygon, best);
            }
        }
    }

    /// Triangle strip; every other triangle is re-wound to keep facing consistent
    pub fn test_triangle_strip(&self, vertices: &[Vec3], indices: &[u32], best: &mut SelectionIntersection) {
        for (i, tri) in indices.windows(3).enumerate() {
            let order = if i % 2 == 0 {
                [tri[0], tri[1], tri[2]]
            } else {
                [tri[1], tri[0], tri[2]]
            };
            if let Some(polygon) = gather(vertices, &order) {
                self.test_polygon(&polygon, best);
            }
        }
    }

    /// Quad strip over vertex pairs `(0,1), (2,3), ...`
    pub fn test_quad_strip(&self, vertices: &[Vec3], indices: &[u32], best: &mut SelectionIntersection) {
        let mut i = 0;
        while i + 3 < indices.len() {
            let quad = [indices[i], indices[i + 1], indices[i + 3], indices[i + 2]];
            if let Some(polygon) = gather(vertices, &quad) {
                self.test_polygon(&polygon, best);
            }
            i += 2;
        }
    }

    /// The six outward-facing faces of a box
    pub fn test_aabb(&self, aabb: &Aabb, best: &mut SelectionIntersection) {
        if !aabb.is_valid() {
            return;
        }
        for axis in 0..3 {
            for positive in [true, false] {
                self.test_polygon(&aabb.face(axis, positive), best);
            }
        }
    }
}

fn gather(vertices: &[Vec3], indices: &[u32]) -> Option<Vec<Vec3>> {
    indices
        .iter()
        .map(|&i| vertices.get(i as usize).copied())
        .collect()
}

/// Closest point of a projected segment to the view ray through the origin
fn segment_intersection(a: Vec3, b: Vec3) -> SelectionIntersection {
    let point = segment_closest_to_origin(a, b);
    SelectionIntersection::new(point.z, point.truncate().length_squared())
}

fn segment_closest_to_origin(a: Vec3, b: Vec3) -> Vec3 {
    let ab = (b - a).truncate();
    let length_squared = ab.length_squared();
    if length_squared <= f32::EPSILON {
        return if a.z <= b.z { a } else { b };
    }
    let t = (-a.truncate().dot(ab) / length_squared).clamp(0.0, 1.0);
    a.lerp(b, t)
}

fn signed_area_xy(points: &[Vec3]) -> f32 {
    let mut area = 0.0;
    let mut previous = points[points.len() - 1];
    for &current in points {
        area += previous.x * current.y - current.x * previous.y;
        previous = current;
    }
    area * 0.5
}

/// Newell normal; robust for any planar polygon
fn polygon_normal(points: &[Vec3]) -> Vec3 {
    let mut normal = Vec3::ZERO;
    let mut previous = points[points.len() - 1];
    for &current in points {
        normal.x += (previous.y - current.y) * (previous.z + current.z);
        normal.y += (previous.z - current.z) * (previous.x + current.x);
        normal.z += (previous.x - current.x) * (previous.y + current.y);
        previous = current;
    }
    normal
}

/// Crossing-number test of the origin against a 2D polygon
fn origin_in_polygon(points: &[Vec3]) -> bool {
    let mut inside = false;
    let mut previous: Vec2 = points[points.len() - 1].truncate();
    for current in points.iter().map(|p| p.truncate()) {
        if (current.y > 0.0) != (previous.y > 0.0) {
            let x = current.x + (0.0 - current.y) * (previous.x - current.x) / (previous.y - current.y);
            if x > 0.0 {
                inside = !inside;
            }
        }
        previous = current;
    }
    inside
}

fn polygon_intersection(points: &[Vec3], cull: CullMode) -> Option<SelectionIntersection> {
    let normal = polygon_normal(points);
    if normal.length_squared() <= ZERO_AREA_EPSILON {
        return None;
    }

    let area = signed_area_xy(points);
    match cull {
        CullMode::Clockwise if area < 0.0 => return None,
        CullMode::CounterClockwise if area > 0.0 => return None,
        _ => {}
    }

    if !origin_in_polygon(points) {
        let mut best = SelectionIntersection::INVALID;
        let mut previous = points[points.len() - 1];
        for &current in points {
            let hit = segment_intersection(previous, current);
            if hit.distance() < best.distance()
                || (hit.distance() == best.distance() && hit.depth() < best.depth())
            {
                best = hit;
            }
            previous = current;
        }
        return best.is_valid().then_some(best);
    }

    let normal = normal.normalize();
    if normal.z.abs() < EDGE_ON_EPSILON {
        let depth = points.iter().map(|p| p.z).fold(f32::MAX, f32::min);
        return Some(SelectionIntersection::with_tie_break(depth, 0.0, 1.0 - normal.z.abs()));
    }
    // plane through points[0]; the view ray is the z axis through the origin
    let depth = normal.dot(points[0]) / normal.z;
    Some(SelectionIntersection::new(depth, 0.0))
}
