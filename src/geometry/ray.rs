use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::utilities::{binary_sign, BoundingBox};

/// Which faces of a triangle a ray can hit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// Counterclockwise wound faces only.
    #[default]
    Front,
    /// Clockwise wound faces only.
    Back,
    /// Both faces.
    Double,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    pub origin: Vec3,
    /// Direction of the ray. Need not be normalized; hit distances are euclidean distances from the
    /// origin.
    pub direction: Vec3,
}

impl Ray {
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    #[inline(always)]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Ray in the frame described by `matrix`.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self {
            origin: matrix.transform_point3(self.origin),
            direction: matrix.transform_vector3(self.direction),
        }
    }

    /// Intersects the ray with triangle `a b c`.
    ///
    /// Returns the ray parameter of the hit. When `backface_culling` is set only triangles wound
    /// counterclockwise as seen from the ray origin are hit.
    pub fn intersect_triangle(
        &self,
        a: Vec3,
        b: Vec3,
        c: Vec3,
        backface_culling: bool,
    ) -> Option<f32> {
        let edge1 = b - a;
        let edge2 = c - a;
        let normal = edge1.cross(edge2);

        let mut ddn = self.direction.dot(normal);
        let sign;
        if ddn > 0.0 {
            if backface_culling {
                return None;
            }
            sign = 1.0;
        } else if ddn < 0.0 {
            sign = -1.0;
            ddn = -ddn;
        } else {
            return None;
        }

        let diff = self.origin - a;
        let ddqxe2 = sign * self.direction.dot(diff.cross(edge2));
        if ddqxe2 < 0.0 {
            return None;
        }
        let dde1xq = sign * self.direction.dot(edge1.cross(diff));
        if dde1xq < 0.0 || ddqxe2 + dde1xq > ddn {
            return None;
        }
        let qdn = -sign * diff.dot(normal);
        if qdn < 0.0 {
            return None;
        }
        Some(qdn / ddn)
    }

    /// Intersects the ray with a triangle honoring the side setting.
    #[inline]
    pub fn intersect_triangle_side(&self, a: Vec3, b: Vec3, c: Vec3, side: Side) -> Option<f32> {
        match side {
            Side::Back => self.intersect_triangle(c, b, a, true),
            Side::Front => self.intersect_triangle(a, b, c, true),
            Side::Double => self.intersect_triangle(a, b, c, false),
        }
    }

    /// Distance parameter at which the ray enters the box, zero if the origin is inside.
    #[inline]
    pub fn intersect_box(&self, bounds: &BoundingBox) -> Option<f32> {
        TreeRay::new(self, f32::INFINITY).intersect(bounds.min, bounds.max)
    }

    #[inline]
    pub fn intersects_box(&self, bounds: &BoundingBox) -> bool {
        self.intersect_box(bounds).is_some()
    }
}

/// Ray representation designed for quicker intersection against axis aligned bounding boxes.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TreeRay {
    pub origin_over_direction: Vec3,
    pub maximum_t: f32,
    pub inverse_direction: Vec3,
}

impl TreeRay {
    #[inline(always)]
    pub fn new(ray: &Ray, maximum_t: f32) -> Self {
        // Near zero direction components are clamped to a tiny magnitude so the resulting slab
        // intervals are huge instead of NaN. The sign is reapplied in the numerator.
        let direction = ray.direction;
        let inverse_direction = Vec3::new(
            binary_sign(direction.x),
            binary_sign(direction.y),
            binary_sign(direction.z),
        ) / direction.abs().max(Vec3::splat(1e-15));
        Self {
            origin_over_direction: ray.origin * inverse_direction,
            maximum_t,
            inverse_direction,
        }
    }

    #[inline(always)]
    pub fn intersect(&self, min: Vec3, max: Vec3) -> Option<f32> {
        let t0 = min * self.inverse_direction - self.origin_over_direction;
        let t1 = max * self.inverse_direction - self.origin_over_direction;
        let t_exit = t0.max(t1);
        let t_entry = t0.min(t1);
        let earliest_exit = self.maximum_t.min(t_exit.min_element());
        let t = t_entry.max_element().max(0.0);
        (t <= earliest_exit).then_some(t)
    }
}
