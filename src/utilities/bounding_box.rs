use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use super::bounding_sphere::BoundingSphere;
use super::containment_type::ContainmentType;

/// Provides simple axis-aligned bounding box functionality.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Location with the lowest X, Y, and Z coordinates in the axis-aligned bounding box.
    pub min: Vec3,
    /// Location with the highest X, Y, and Z coordinates in the axis-aligned bounding box.
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BoundingBox {
    /// An inverted box that any union or point expansion will overwrite.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Constructs a bounding box from the specified minimum and maximum.
    #[inline]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Constructs a bounding box from the `[min xyz, max xyz]` layout used by packed nodes.
    #[inline]
    pub fn from_array(data: &[f32; 6]) -> Self {
        Self {
            min: Vec3::new(data[0], data[1], data[2]),
            max: Vec3::new(data[3], data[4], data[5]),
        }
    }

    /// Writes the box in the `[min xyz, max xyz]` layout used by packed nodes.
    #[inline]
    pub fn to_array(&self) -> [f32; 6] {
        [
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z,
        ]
    }

    /// True if the box has never been expanded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    /// Determines if a bounding box intersects another bounding box. Touching boxes intersect.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        Self::intersects_bounds(self.min, self.max, other.min, other.max)
    }

    /// Determines if a bounding box intersects another bounding box.
    #[inline]
    pub fn intersects_bounds(min_a: Vec3, max_a: Vec3, min_b: Vec3, max_b: Vec3) -> bool {
        let no_intersection_on_axes = max_a.cmplt(min_b) | max_b.cmplt(min_a);
        !no_intersection_on_axes.any()
    }

    /// Determines if a bounding box intersects a bounding sphere.
    #[inline]
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        let offset = sphere.center - self.clamp_point(sphere.center);
        offset.dot(offset) <= sphere.radius * sphere.radius
    }

    /// Classifies how `other` sits relative to this box.
    #[inline]
    pub fn contains(&self, other: &BoundingBox) -> ContainmentType {
        if !self.intersects(other) {
            ContainmentType::Disjoint
        } else if self.min.cmple(other.min).all() && self.max.cmpge(other.max).all() {
            ContainmentType::Contains
        } else {
            ContainmentType::Intersects
        }
    }

    /// True if the point lies inside or on the box.
    #[inline]
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.min.cmple(point).all() && self.max.cmpge(point).all()
    }

    /// Computes a bounding box which contains two other bounding boxes.
    #[inline]
    pub fn create_merged(min_a: Vec3, max_a: Vec3, min_b: Vec3, max_b: Vec3) -> (Vec3, Vec3) {
        (min_a.min(min_b), max_a.max(max_b))
    }

    /// Computes a bounding box which contains two other bounding boxes.
    #[inline]
    pub fn union(&self, other: &Self) -> Self {
        let (min, max) = Self::create_merged(self.min, self.max, other.min, other.max);
        Self { min, max }
    }

    /// Grows the box to include the point.
    #[inline]
    pub fn expand_by_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Creates the smallest possible bounding box that contains a list of points.
    /// Returns an empty box for an empty list.
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut result = Self::EMPTY;
        for point in points {
            result.expand_by_point(*point);
        }
        result
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Index of the axis with the largest extent. Ties resolve to the earliest axis.
    pub fn longest_axis(&self) -> usize {
        let size = self.size();
        let mut axis = 0;
        let mut longest = f32::NEG_INFINITY;
        for i in 0..3 {
            if size[i] > longest {
                longest = size[i];
                axis = i;
            }
        }
        axis
    }

    /// Computes the surface area of the box. Empty boxes have no area.
    #[inline]
    pub fn surface_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.size();
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Clamps a point onto the box.
    #[inline]
    pub fn clamp_point(&self, point: Vec3) -> Vec3 {
        point.max(self.min).min(self.max)
    }

    /// Squared distance from the point to the closest point on the box; zero inside.
    #[inline]
    pub fn distance_squared_to_point(&self, point: Vec3) -> f32 {
        self.clamp_point(point).distance_squared(point)
    }

    /// Box corner selected by the low three bits of `index` (bit 0 = x, bit 1 = y, bit 2 = z).
    #[inline]
    pub fn corner(&self, index: usize) -> Vec3 {
        Vec3::new(
            if index & 1 != 0 { self.max.x } else { self.min.x },
            if index & 2 != 0 { self.max.y } else { self.min.y },
            if index & 4 != 0 { self.max.z } else { self.min.z },
        )
    }

    /// Axis-aligned box enclosing this box after an affine transform.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        let mut result = Self::EMPTY;
        for i in 0..8 {
            result.expand_by_point(matrix.transform_point3(self.corner(i)));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_and_containment() {
        let a = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        let b = BoundingBox::new(Vec3::splat(0.5), Vec3::splat(2.0));
        let merged = a.union(&b);
        assert_eq!(merged.min, Vec3::ZERO);
        assert_eq!(merged.max, Vec3::splat(2.0));
        assert_eq!(merged.contains(&a), ContainmentType::Contains);
        assert_eq!(a.contains(&b), ContainmentType::Intersects);
        let far = BoundingBox::new(Vec3::splat(5.0), Vec3::splat(6.0));
        assert_eq!(a.contains(&far), ContainmentType::Disjoint);
    }

    #[test]
    fn empty_box_is_overwritten() {
        let mut b = BoundingBox::EMPTY;
        assert!(b.is_empty());
        assert_eq!(b.surface_area(), 0.0);
        b.expand_by_point(Vec3::new(1.0, 2.0, 3.0));
        assert!(!b.is_empty());
        assert_eq!(b.min, b.max);
    }

    #[test]
    fn distance_to_point() {
        let b = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        assert_eq!(b.distance_squared_to_point(Vec3::splat(0.5)), 0.0);
        assert_eq!(b.distance_squared_to_point(Vec3::new(3.0, 0.5, 0.5)), 4.0);
    }

    #[test]
    fn longest_axis_prefers_earliest_on_ties() {
        let b = BoundingBox::new(Vec3::ZERO, Vec3::new(1.0, 3.0, 3.0));
        assert_eq!(b.longest_axis(), 1);
        let flat = BoundingBox::new(Vec3::ZERO, Vec3::ZERO);
        assert_eq!(flat.longest_axis(), 0);
    }

    #[test]
    fn transformed_box_encloses_rotated_corners() {
        let b = BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let rotated = b.transformed(&Mat4::from_rotation_z(std::f32::consts::FRAC_PI_4));
        let expected = 2.0f32.sqrt();
        assert!((rotated.max.x - expected).abs() < 1e-5);
        assert!((rotated.min.y + expected).abs() < 1e-5);
        assert!((rotated.max.z - 1.0).abs() < 1e-6);
    }
}
