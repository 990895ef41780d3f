use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::ray::{Ray, Side};
use crate::utilities::BoundingBox;

/// Triangle defined by three vertices. Counterclockwise winding faces the viewer.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

impl Triangle {
    #[inline(always)]
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    #[inline(always)]
    pub fn points(&self) -> [Vec3; 3] {
        [self.a, self.b, self.c]
    }

    /// Unit face normal, or zero for degenerate triangles.
    #[inline]
    pub fn normal(&self) -> Vec3 {
        (self.c - self.b).cross(self.a - self.b).normalize_or_zero()
    }

    #[inline]
    pub fn midpoint(&self) -> Vec3 {
        (self.a + self.b + self.c) / 3.0
    }

    #[inline]
    pub fn area(&self) -> f32 {
        (self.c - self.b).cross(self.a - self.b).length() * 0.5
    }

    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.points())
    }

    /// Applies `f` to every vertex.
    #[inline]
    pub fn map(&self, f: impl Fn(Vec3) -> Vec3) -> Self {
        Self::new(f(self.a), f(self.b), f(self.c))
    }

    /// Ray parameter of the hit against this triangle, honoring `side`.
    #[inline]
    pub fn ray_test(&self, ray: &Ray, side: Side) -> Option<f32> {
        ray.intersect_triangle_side(self.a, self.b, self.c, side)
    }

    /// Closest point on the triangle to `point`, by Voronoi region classification.
    pub fn closest_point_to_point(&self, point: Vec3) -> Vec3 {
        let (a, b, c) = (self.a, self.b, self.c);
        let ab = b - a;
        let ac = c - a;
        let ap = point - a;
        let d1 = ab.dot(ap);
        let d2 = ac.dot(ap);
        if d1 <= 0.0 && d2 <= 0.0 {
            return a;
        }

        let bp = point - b;
        let d3 = ab.dot(bp);
        let d4 = ac.dot(bp);
        if d3 >= 0.0 && d4 <= d3 {
            return b;
        }

        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            return a + ab * (d1 / (d1 - d3));
        }

        let cp = point - c;
        let d5 = ab.dot(cp);
        let d6 = ac.dot(cp);
        if d6 >= 0.0 && d5 <= d6 {
            return c;
        }

        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            return a + ac * (d2 / (d2 - d6));
        }

        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && d4 - d3 >= 0.0 && d5 - d6 >= 0.0 {
            return b + (c - b) * ((d4 - d3) / ((d4 - d3) + (d5 - d6)));
        }

        let denominator = va + vb + vc;
        if denominator == 0.0 {
            // Collinear vertices.
            return [a, b, c]
                .into_iter()
                .min_by(|x, y| x.distance_squared(point).total_cmp(&y.distance_squared(point)))
                .unwrap_or(a);
        }
        let inverse = 1.0 / denominator;
        a + ab * (vb * inverse) + ac * (vc * inverse)
    }

    #[inline]
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.closest_point_to_point(point).distance(point)
    }
}
