use glam::Mat4;

use super::mesh_bvh::MeshBvh;
use super::tree_shapecast::{BoundsTest, NodeContext, RangeVisitor, ShapecastIntersection, TraversalOrder};
use crate::geometry::{ExtendedTriangle, OrientedBox};
use crate::utilities::{BoundingBox, BoundingSphere};

struct OrientedBoxQuery {
    obb: OrientedBox,
}

impl BoundsTest for OrientedBoxQuery {
    #[inline]
    fn intersects_bounds(&mut self, bounds: &BoundingBox, _: NodeContext) -> ShapecastIntersection {
        self.obb.intersects_box(bounds).into()
    }
}

impl RangeVisitor for OrientedBoxQuery {
    #[inline]
    fn intersects_triangle(&mut self, triangle: &ExtendedTriangle, _: usize, _: bool, _: usize) -> bool {
        self.obb.intersects_triangle(triangle)
    }
}

impl TraversalOrder for OrientedBoxQuery {}

struct SphereQuery {
    sphere: BoundingSphere,
}

impl BoundsTest for SphereQuery {
    #[inline]
    fn intersects_bounds(&mut self, bounds: &BoundingBox, _: NodeContext) -> ShapecastIntersection {
        self.sphere.intersects_box(bounds).into()
    }
}

impl RangeVisitor for SphereQuery {
    #[inline]
    fn intersects_triangle(&mut self, triangle: &ExtendedTriangle, _: usize, _: bool, _: usize) -> bool {
        triangle.intersects_sphere(&self.sphere)
    }
}

impl TraversalOrder for SphereQuery {}

impl MeshBvh {
    /// Tests whether any triangle touches `bounds` placed in mesh space by `box_to_mesh`.
    pub fn intersects_box(&self, bounds: &BoundingBox, box_to_mesh: &Mat4) -> bool {
        let mut query = OrientedBoxQuery {
            obb: OrientedBox::new(bounds.min, bounds.max, *box_to_mesh),
        };
        self.shapecast(&mut query)
    }

    /// Tests whether any triangle touches a mesh space sphere.
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        let mut query = SphereQuery { sphere: *sphere };
        self.shapecast(&mut query)
    }
}
