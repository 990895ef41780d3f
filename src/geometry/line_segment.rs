use glam::Vec3;

use crate::utilities::{closest_point_on_segment, closest_points_segment_to_segment};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LineSegment {
    pub start: Vec3,
    pub end: Vec3,
}

impl LineSegment {
    #[inline]
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn delta(&self) -> Vec3 {
        self.end - self.start
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.delta().length()
    }

    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.start + self.delta() * t
    }

    #[inline]
    pub fn closest_point_to_point(&self, point: Vec3) -> Vec3 {
        closest_point_on_segment(self.start, self.end, point)
    }

    /// Closest points between two segments, on `self` and `other` respectively.
    #[inline]
    pub fn closest_points_to_segment(&self, other: &LineSegment) -> (Vec3, Vec3) {
        closest_points_segment_to_segment(self.start, self.end, other.start, other.end)
    }
}
