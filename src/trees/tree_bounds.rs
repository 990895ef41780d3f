use glam::Vec3;

use super::constants::FLOAT32_EPSILON;
use crate::geometry::MeshGeometry;
use crate::utilities::BoundingBox;

/// Per-triangle `[cx, hx, cy, hy, cz, hz]` records: the center and half extent on each axis.
///
/// Records are kept in the same order as the triangles they describe, so every partition swap must
/// be mirrored here.
#[derive(Clone, Debug)]
pub(crate) struct TriangleBounds {
    data: Vec<f32>,
}

impl TriangleBounds {
    /// Computes the records for every triangle of the geometry in index order.
    pub fn compute(geometry: &MeshGeometry) -> Self {
        let triangle_count = geometry.triangle_count();
        let mut data = vec![0.0; triangle_count * 6];
        for triangle in 0..triangle_count {
            let [a, b, c] = geometry
                .triangle_vertex_indices(triangle)
                .map(|i| geometry.position(i as usize));
            let record = &mut data[triangle * 6..triangle * 6 + 6];
            for axis in 0..3 {
                let min = a[axis].min(b[axis]).min(c[axis]);
                let max = a[axis].max(b[axis]).max(c[axis]);
                let half_extent = (max - min) / 2.0;
                record[axis * 2] = min + half_extent;
                record[axis * 2 + 1] = half_extent + (min.abs() + half_extent) * FLOAT32_EPSILON;
            }
        }
        Self { data }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.data.len() / 6
    }

    #[inline(always)]
    pub fn center(&self, triangle: usize, axis: usize) -> f32 {
        self.data[triangle * 6 + axis * 2]
    }

    #[inline(always)]
    pub fn centroid(&self, triangle: usize) -> Vec3 {
        let record = &self.data[triangle * 6..triangle * 6 + 6];
        Vec3::new(record[0], record[2], record[4])
    }

    #[inline(always)]
    pub fn bounds(&self, triangle: usize) -> BoundingBox {
        let record = &self.data[triangle * 6..triangle * 6 + 6];
        let center = Vec3::new(record[0], record[2], record[4]);
        let half = Vec3::new(record[1], record[3], record[5]);
        BoundingBox::new(center - half, center + half)
    }

    #[inline(always)]
    pub fn expand(&self, triangle: usize, target: &mut BoundingBox) {
        let bounds = self.bounds(triangle);
        target.min = target.min.min(bounds.min);
        target.max = target.max.max(bounds.max);
    }

    #[inline(always)]
    pub fn swap(&mut self, a: usize, b: usize) {
        for i in 0..6 {
            self.data.swap(a * 6 + i, b * 6 + i);
        }
    }

    /// Bounds of the triangles in `offset..offset + count` and bounds of their centers.
    pub fn range_bounds(&self, offset: usize, count: usize) -> (BoundingBox, BoundingBox) {
        let mut bounds = BoundingBox::EMPTY;
        let mut centroid_bounds = BoundingBox::EMPTY;
        for triangle in offset..offset + count {
            self.expand(triangle, &mut bounds);
            centroid_bounds.expand_by_point(self.centroid(triangle));
        }
        (bounds, centroid_bounds)
    }
}
