use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::bounding_box::BoundingBox;

/// Provides XNA-like bounding sphere functionality.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere {
    /// Location of the center of the sphere.
    pub center: Vec3,
    /// Radius of the sphere.
    pub radius: f32,
}

impl BoundingSphere {
    #[inline]
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Sphere centered on the points' bounding box, wide enough to hold every point.
    pub fn from_points(points: &[Vec3]) -> Self {
        let center = BoundingBox::from_points(points).center();
        let radius = points
            .iter()
            .map(|p| p.distance_squared(center))
            .fold(0.0f32, f32::max)
            .sqrt();
        Self { center, radius }
    }

    #[inline]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.distance_squared(self.center) <= self.radius * self.radius
    }

    #[inline]
    pub fn intersects_box(&self, bounds: &BoundingBox) -> bool {
        bounds.intersects_sphere(self)
    }

    #[inline]
    pub fn intersects_sphere(&self, other: &BoundingSphere) -> bool {
        let radius = self.radius + other.radius;
        self.center.distance_squared(other.center) <= radius * radius
    }
}
