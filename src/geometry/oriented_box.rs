use glam::{Mat4, Vec3};

use super::extended_triangle::ExtendedTriangle;
use super::line_segment::LineSegment;
use crate::utilities::{separated_on_axis, BoundingBox, SeparatingAxisBounds};

/// Box edges as pairs of corner indices. Corner bits follow [`BoundingBox::corner`].
const BOX_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (2, 3),
    (4, 5),
    (6, 7),
    (0, 2),
    (1, 3),
    (4, 6),
    (5, 7),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// Axis-aligned box in its own frame, placed in the world by an affine matrix.
///
/// World space corners, axes and projections are cached at construction for repeated separating
/// axis tests against tree nodes.
#[derive(Clone, Copy, Debug)]
pub struct OrientedBox {
    pub min: Vec3,
    pub max: Vec3,
    /// Box frame to world transform.
    pub matrix: Mat4,
    pub inverse_matrix: Mat4,
    points: [Vec3; 8],
    sat_axes: [Vec3; 3],
    sat_bounds: [SeparatingAxisBounds; 3],
    aligned_sat_bounds: [SeparatingAxisBounds; 3],
}

impl OrientedBox {
    pub fn new(min: Vec3, max: Vec3, matrix: Mat4) -> Self {
        let local = BoundingBox::new(min, max);
        let points: [Vec3; 8] = std::array::from_fn(|i| matrix.transform_point3(local.corner(i)));
        let sat_axes = [
            (points[1] - points[0]).normalize_or_zero(),
            (points[2] - points[0]).normalize_or_zero(),
            (points[4] - points[0]).normalize_or_zero(),
        ];
        let sat_bounds = sat_axes.map(|axis| SeparatingAxisBounds::from_points(axis, &points));
        let aligned_sat_bounds =
            [Vec3::X, Vec3::Y, Vec3::Z].map(|axis| SeparatingAxisBounds::from_points(axis, &points));
        Self {
            min,
            max,
            matrix,
            inverse_matrix: matrix.inverse(),
            points,
            sat_axes,
            sat_bounds,
            aligned_sat_bounds,
        }
    }

    pub fn from_box(bounds: &BoundingBox, matrix: Mat4) -> Self {
        Self::new(bounds.min, bounds.max, matrix)
    }

    /// World space corners.
    #[inline]
    pub fn points(&self) -> &[Vec3; 8] {
        &self.points
    }

    /// World space axis-aligned bounds of the box.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.points)
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        BoundingBox::new(self.min, self.max).contains_point(self.inverse_matrix.transform_point3(point))
    }

    pub fn closest_point_to_point(&self, point: Vec3) -> Vec3 {
        let local = self.inverse_matrix.transform_point3(point);
        let clamped = local.clamp(self.min, self.max);
        self.matrix.transform_point3(clamped)
    }

    #[inline]
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.closest_point_to_point(point).distance(point)
    }

    /// Separating axis test against an axis-aligned box.
    pub fn intersects_box(&self, bounds: &BoundingBox) -> bool {
        for i in 0..3 {
            let projected = SeparatingAxisBounds {
                min: bounds.min[i],
                max: bounds.max[i],
            };
            if self.aligned_sat_bounds[i].is_separated(&projected) {
                return false;
            }
        }

        let corners: [Vec3; 8] = std::array::from_fn(|i| bounds.corner(i));
        for i in 0..3 {
            let projected = SeparatingAxisBounds::from_points(self.sat_axes[i], &corners);
            if self.sat_bounds[i].is_separated(&projected) {
                return false;
            }
        }

        for axis in &self.sat_axes {
            for world_axis in [Vec3::X, Vec3::Y, Vec3::Z] {
                if separated_on_axis(axis.cross(world_axis), &self.points, &corners) {
                    return false;
                }
            }
        }
        true
    }

    /// Separating axis test against a triangle.
    pub fn intersects_triangle(&self, triangle: &ExtendedTriangle) -> bool {
        let points = triangle.points();
        for i in 0..3 {
            let projected = SeparatingAxisBounds::from_points(self.sat_axes[i], &points);
            if self.sat_bounds[i].is_separated(&projected) {
                return false;
            }
        }

        let [normal, edges @ ..] = triangle.sat_axes();
        if separated_on_axis(normal, &self.points, &points) {
            return false;
        }
        for axis in &self.sat_axes {
            for edge in &edges {
                if separated_on_axis(axis.cross(*edge), &self.points, &points) {
                    return false;
                }
            }
        }
        true
    }

    fn edge_segments(points: &[Vec3; 8]) -> [LineSegment; 12] {
        BOX_EDGES.map(|(a, b)| LineSegment::new(points[a], points[b]))
    }

    /// Distance between the oriented box and an axis-aligned box. Zero when they intersect.
    ///
    /// Returns as soon as a distance under `threshold` is found.
    pub fn distance_to_box(&self, bounds: &BoundingBox, threshold: f32) -> f32 {
        if self.intersects_box(bounds) {
            return 0.0;
        }

        let threshold_squared = threshold * threshold;
        let mut closest_squared = f32::INFINITY;

        for point in &self.points {
            closest_squared = closest_squared.min(bounds.distance_squared_to_point(*point));
            if closest_squared < threshold_squared {
                return closest_squared.sqrt();
            }
        }

        let corners: [Vec3; 8] = std::array::from_fn(|i| bounds.corner(i));
        for corner in &corners {
            closest_squared =
                closest_squared.min(self.closest_point_to_point(*corner).distance_squared(*corner));
            if closest_squared < threshold_squared {
                return closest_squared.sqrt();
            }
        }

        let box_segments = Self::edge_segments(&corners);
        for segment in &Self::edge_segments(&self.points) {
            for other in &box_segments {
                let (p1, p2) = segment.closest_points_to_segment(other);
                closest_squared = closest_squared.min(p1.distance_squared(p2));
                if closest_squared < threshold_squared {
                    return closest_squared.sqrt();
                }
            }
        }

        closest_squared.sqrt()
    }
}
