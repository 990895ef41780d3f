use glam::{Mat4, Vec3};

use super::line_segment::LineSegment;
use super::triangle::Triangle;
use crate::utilities::{separated_on_axis, BoundingSphere};

/// Normals closer to parallel than this are treated as coplanar.
const PARALLEL_EPSILON: f32 = 1e-6;
/// Triangles with a squared double area below this are handled as segments.
const DEGENERATE_EPSILON: f32 = 1e-12;

/// Triangle with cached data for separating axis and distance queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtendedTriangle {
    pub triangle: Triangle,
    /// Unit face normal. Zero when degenerate.
    pub normal: Vec3,
    /// Plane constant, `normal.dot(point)` for any point on the triangle.
    pub constant: f32,
    /// Edge directions `b - a`, `c - b` and `a - c`.
    pub edges: [Vec3; 3],
    pub sphere: BoundingSphere,
    pub is_degenerate: bool,
}

impl From<Triangle> for ExtendedTriangle {
    fn from(triangle: Triangle) -> Self {
        Self::new(triangle)
    }
}

impl ExtendedTriangle {
    pub fn new(triangle: Triangle) -> Self {
        let Triangle { a, b, c } = triangle;
        let edges = [b - a, c - b, a - c];
        let doubled = edges[0].cross(c - a);
        let is_degenerate = doubled.length_squared() <= DEGENERATE_EPSILON;
        let normal = if is_degenerate {
            Vec3::ZERO
        } else {
            doubled.normalize()
        };
        Self {
            triangle,
            normal,
            constant: normal.dot(a),
            edges,
            sphere: BoundingSphere::from_points(&triangle.points()),
            is_degenerate,
        }
    }

    pub fn from_points(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self::new(Triangle::new(a, b, c))
    }

    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self::new(self.triangle.map(|p| matrix.transform_point3(p)))
    }

    #[inline(always)]
    pub fn points(&self) -> [Vec3; 3] {
        self.triangle.points()
    }

    #[inline]
    pub fn edge_segments(&self) -> [LineSegment; 3] {
        let [a, b, c] = self.points();
        [
            LineSegment::new(a, b),
            LineSegment::new(b, c),
            LineSegment::new(c, a),
        ]
    }

    /// Axes the triangle contributes to a separating axis test: the normal followed by the edges.
    #[inline]
    pub fn sat_axes(&self) -> [Vec3; 4] {
        [self.normal, self.edges[0], self.edges[1], self.edges[2]]
    }

    /// Longest edge of a degenerate triangle.
    fn longest_edge(&self) -> LineSegment {
        let segments = self.edge_segments();
        let mut longest = segments[0];
        for segment in &segments[1..] {
            if segment.length() > longest.length() {
                longest = *segment;
            }
        }
        longest
    }

    #[inline]
    pub fn closest_point_to_point(&self, point: Vec3) -> Vec3 {
        self.triangle.closest_point_to_point(point)
    }

    #[inline]
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.triangle.distance_to_point(point)
    }

    #[inline]
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        self.closest_point_to_point(sphere.center)
            .distance_squared(sphere.center)
            <= sphere.radius * sphere.radius
    }

    /// Tests two triangles for intersection.
    ///
    /// Returns the shared segment when they intersect. Coplanar triangles produce a zero length
    /// segment since the overlap region is a polygon rather than an edge.
    pub fn intersects_triangle(&self, other: &ExtendedTriangle) -> Option<LineSegment> {
        if self.is_degenerate || other.is_degenerate {
            return self.intersects_degenerate(other);
        }

        let points1 = self.points();
        let points2 = other.points();
        if separated_on_axis(self.normal, &points1, &points2)
            || separated_on_axis(other.normal, &points1, &points2)
        {
            return None;
        }

        let coplanar = 1.0 - self.normal.dot(other.normal).abs() < PARALLEL_EPSILON;
        if coplanar {
            for edge in self.edges.iter().chain(other.edges.iter()) {
                if separated_on_axis(self.normal.cross(*edge), &points1, &points2) {
                    return None;
                }
            }
            tracing::warn!(
                "coplanar triangle intersection does not compute an intersection edge; returning a zero length segment"
            );
            let point = self.closest_point_to_point(other.triangle.midpoint());
            return Some(LineSegment::new(point, point));
        }

        for edge1 in &self.edges {
            for edge2 in &other.edges {
                if separated_on_axis(edge1.cross(*edge2), &points1, &points2) {
                    return None;
                }
            }
        }

        let direction = self.normal.cross(other.normal);
        let section1 = plane_section(&points1, other.normal, other.constant, direction);
        let section2 = plane_section(&points2, self.normal, self.constant, direction);
        match (section1, section2) {
            (Some(s1), Some(s2)) => {
                let start = if s1.min_t >= s2.min_t { s1.min } else { s2.min };
                let end = if s1.max_t <= s2.max_t { s1.max } else { s2.max };
                if s1.min_t.max(s2.min_t) > s1.max_t.min(s2.max_t) {
                    Some(LineSegment::new(start, start))
                } else {
                    Some(LineSegment::new(start, end))
                }
            }
            (Some(s), None) | (None, Some(s)) => Some(LineSegment::new(s.min, s.min)),
            (None, None) => {
                let point = self.closest_point_to_point(other.triangle.midpoint());
                Some(LineSegment::new(point, point))
            }
        }
    }

    fn intersects_degenerate(&self, other: &ExtendedTriangle) -> Option<LineSegment> {
        let (distance, point, _) = self.distance_to_triangle(other);
        (distance <= f32::EPSILON).then(|| LineSegment::new(point, point))
    }

    /// Minimum distance between two triangles with the closest point on each.
    pub fn distance_to_triangle(&self, other: &ExtendedTriangle) -> (f32, Vec3, Vec3) {
        if !self.is_degenerate && !other.is_degenerate {
            if let Some(segment) = self.intersects_triangle(other) {
                return (0.0, segment.start, segment.start);
            }
        }

        let mut best = (f32::INFINITY, Vec3::ZERO, Vec3::ZERO);
        let mut consider = |on_self: Vec3, on_other: Vec3| {
            let distance = on_self.distance_squared(on_other);
            if distance < best.0 {
                best = (distance, on_self, on_other);
            }
        };

        if !self.is_degenerate {
            for point in other.points() {
                consider(self.closest_point_to_point(point), point);
            }
        }
        if !other.is_degenerate {
            for point in self.points() {
                consider(point, other.closest_point_to_point(point));
            }
        }

        let segments1 = if self.is_degenerate {
            vec![self.longest_edge()]
        } else {
            self.edge_segments().to_vec()
        };
        let segments2 = if other.is_degenerate {
            vec![other.longest_edge()]
        } else {
            other.edge_segments().to_vec()
        };
        for segment1 in &segments1 {
            for segment2 in &segments2 {
                let (p1, p2) = segment1.closest_points_to_segment(segment2);
                consider(p1, p2);
            }
        }

        // A degenerate segment can pierce the face of the other triangle.
        if self.is_degenerate != other.is_degenerate {
            let (segment, face) = if self.is_degenerate {
                (self.longest_edge(), other)
            } else {
                (other.longest_edge(), self)
            };
            if let Some(point) = segment_face_intersection(&segment, face) {
                consider(point, point);
            }
        }

        (best.0.sqrt(), best.1, best.2)
    }
}

struct PlaneSection {
    min_t: f32,
    min: Vec3,
    max_t: f32,
    max: Vec3,
}

/// Where a triangle crosses a plane, as the extreme crossing points along `direction`.
fn plane_section(
    points: &[Vec3; 3],
    normal: Vec3,
    constant: f32,
    direction: Vec3,
) -> Option<PlaneSection> {
    let distances = points.map(|p| normal.dot(p) - constant);
    let mut section: Option<PlaneSection> = None;
    let mut add = |point: Vec3| {
        let t = direction.dot(point);
        match &mut section {
            None => {
                section = Some(PlaneSection {
                    min_t: t,
                    min: point,
                    max_t: t,
                    max: point,
                })
            }
            Some(s) => {
                if t < s.min_t {
                    s.min_t = t;
                    s.min = point;
                }
                if t > s.max_t {
                    s.max_t = t;
                    s.max = point;
                }
            }
        }
    };
    for i in 0..3 {
        let j = (i + 1) % 3;
        let (di, dj) = (distances[i], distances[j]);
        if di == 0.0 {
            add(points[i]);
        }
        if (di < 0.0 && dj > 0.0) || (di > 0.0 && dj < 0.0) {
            add(points[i] + (points[j] - points[i]) * (di / (di - dj)));
        }
    }
    section
}

/// Point where a segment passes through a non-degenerate triangle.
fn segment_face_intersection(segment: &LineSegment, face: &ExtendedTriangle) -> Option<Vec3> {
    let d0 = face.normal.dot(segment.start) - face.constant;
    let d1 = face.normal.dot(segment.end) - face.constant;
    if (d0 > 0.0 && d1 > 0.0) || (d0 < 0.0 && d1 < 0.0) || d0 == d1 {
        return None;
    }
    let point = segment.at(d0 / (d0 - d1));
    (face.closest_point_to_point(point).distance_squared(point) <= f32::EPSILON).then_some(point)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat() -> ExtendedTriangle {
        ExtendedTriangle::from_points(
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(0.0, 0.0, 1.0),
        )
    }

    #[test]
    fn crossing_triangles_share_a_segment() {
        let vertical = ExtendedTriangle::from_points(
            Vec3::new(0.0, -1.0, -0.5),
            Vec3::new(0.0, 1.0, -0.5),
            Vec3::new(0.0, 1.0, 0.5),
        );
        let segment = flat().intersects_triangle(&vertical);
        let segment = segment.expect("triangles cross");
        assert!(segment.start.y.abs() < 1e-6 && segment.end.y.abs() < 1e-6);
        assert!(segment.start.x.abs() < 1e-6 && segment.end.x.abs() < 1e-6);
        assert!((segment.length() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn separated_triangles() {
        let lifted = flat().transformed(&Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)));
        assert!(flat().intersects_triangle(&lifted).is_none());
        let (distance, p1, p2) = flat().distance_to_triangle(&lifted);
        assert!((distance - 2.0).abs() < 1e-6);
        assert!((p1.distance(p2) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn coplanar_overlap_is_reported() {
        let shifted = flat().transformed(&Mat4::from_translation(Vec3::new(0.5, 0.0, 0.0)));
        let segment = flat().intersects_triangle(&shifted).expect("coplanar overlap");
        assert_eq!(segment.length(), 0.0);
        let far = flat().transformed(&Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)));
        assert!(flat().intersects_triangle(&far).is_none());
    }

    #[test]
    fn edge_to_edge_distance() {
        let other = ExtendedTriangle::from_points(
            Vec3::new(0.0, 1.0, 2.0),
            Vec3::new(0.0, -1.0, 2.0),
            Vec3::new(0.0, 0.0, 4.0),
        );
        // Closest features are the apex of `flat` and the bottom edge of `other`.
        let (distance, _, _) = flat().distance_to_triangle(&other);
        assert!((distance - 1.0).abs() < 1e-6);
    }

    #[test]
    fn sphere_touches_triangle() {
        let t = flat();
        assert!(t.intersects_sphere(&BoundingSphere::new(Vec3::new(0.0, 0.5, 0.0), 0.6)));
        assert!(!t.intersects_sphere(&BoundingSphere::new(Vec3::new(0.0, 0.5, 0.0), 0.4)));
    }
}
