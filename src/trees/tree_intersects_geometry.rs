use glam::Mat4;

use super::mesh_bvh::MeshBvh;
use super::tree_shapecast::{
    BoundsTest, NodeContext, RangeVisitor, ShapecastIntersection, TraversalOrder, TriangleRange,
};
use crate::geometry::{ExtendedTriangle, MeshGeometry, OrientedBox};
use crate::utilities::BoundingBox;

/// The second mesh of a mesh versus mesh query. Triangles of a [`OtherGeometry::Bvh`] are pruned
/// through its tree; a raw geometry is tested exhaustively.
#[derive(Clone, Copy, Debug)]
pub enum OtherGeometry<'a> {
    Raw(&'a MeshGeometry),
    Bvh(&'a MeshBvh),
}

impl<'a> From<&'a MeshGeometry> for OtherGeometry<'a> {
    fn from(geometry: &'a MeshGeometry) -> Self {
        OtherGeometry::Raw(geometry)
    }
}

impl<'a> From<&'a MeshBvh> for OtherGeometry<'a> {
    fn from(bvh: &'a MeshBvh) -> Self {
        OtherGeometry::Bvh(bvh)
    }
}

impl<'a> OtherGeometry<'a> {
    pub fn geometry(&self) -> &'a MeshGeometry {
        match *self {
            OtherGeometry::Raw(geometry) => geometry,
            OtherGeometry::Bvh(bvh) => bvh.geometry(),
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        match self {
            OtherGeometry::Raw(geometry) => geometry.bounding_box(),
            OtherGeometry::Bvh(bvh) => bvh.bounding_box(),
        }
    }
}

/// Every triangle of a raw geometry, or nothing for a geometry that brings its own tree.
pub(crate) fn raw_triangles(other: OtherGeometry<'_>) -> Vec<ExtendedTriangle> {
    match other {
        OtherGeometry::Raw(geometry) => (0..geometry.triangle_count())
            .map(|i| ExtendedTriangle::new(geometry.triangle(i)))
            .collect(),
        OtherGeometry::Bvh(_) => Vec::new(),
    }
}

/// Collects the triangles of a range so they can be revisited for every candidate of the other
/// mesh.
pub(crate) fn collect_range(range: &TriangleRange<'_>) -> Vec<(usize, ExtendedTriangle)> {
    range.triangles().collect()
}

struct GeometryIntersection<'a> {
    other: OtherGeometry<'a>,
    /// Triangles of a raw other geometry, in its own frame.
    raw_triangles: Vec<ExtendedTriangle>,
    obb: OrientedBox,
    geometry_to_bvh: Mat4,
    bvh_to_geometry: Mat4,
}

impl BoundsTest for GeometryIntersection<'_> {
    #[inline]
    fn intersects_bounds(&mut self, bounds: &BoundingBox, _: NodeContext) -> ShapecastIntersection {
        self.obb.intersects_box(bounds).into()
    }
}

impl RangeVisitor for GeometryIntersection<'_> {
    fn intersects_range(&mut self, range: &TriangleRange<'_>) -> bool {
        match self.other {
            OtherGeometry::Bvh(other) => {
                let mut leaf = LeafAgainstOther {
                    local: collect_range(range),
                    obb: OrientedBox::from_box(&range.bounds, self.bvh_to_geometry),
                    geometry_to_bvh: self.geometry_to_bvh,
                };
                other.shapecast(&mut leaf)
            }
            OtherGeometry::Raw(_) => {
                range.triangles().any(|(_, local)| {
                    let local = local.transformed(&self.bvh_to_geometry);
                    self.raw_triangles
                        .iter()
                        .any(|other| local.intersects_triangle(other).is_some())
                })
            }
        }
    }
}

impl TraversalOrder for GeometryIntersection<'_> {}

/// Walks the other tree with one leaf of this tree placed in the other mesh's frame.
struct LeafAgainstOther {
    local: Vec<(usize, ExtendedTriangle)>,
    obb: OrientedBox,
    geometry_to_bvh: Mat4,
}

impl BoundsTest for LeafAgainstOther {
    #[inline]
    fn intersects_bounds(&mut self, bounds: &BoundingBox, _: NodeContext) -> ShapecastIntersection {
        self.obb.intersects_box(bounds).into()
    }
}

impl RangeVisitor for LeafAgainstOther {
    fn intersects_triangle(&mut self, triangle: &ExtendedTriangle, _: usize, _: bool, _: usize) -> bool {
        let triangle = triangle.transformed(&self.geometry_to_bvh);
        self.local
            .iter()
            .any(|(_, local)| local.intersects_triangle(&triangle).is_some())
    }
}

impl TraversalOrder for LeafAgainstOther {}

impl MeshBvh {
    /// Tests whether any triangle of `other`, placed in this mesh's frame by `geometry_to_bvh`,
    /// touches a triangle of this mesh.
    pub fn intersects_geometry<'a>(
        &self,
        other: impl Into<OtherGeometry<'a>>,
        geometry_to_bvh: &Mat4,
    ) -> bool {
        let other = other.into();
        let mut query = GeometryIntersection {
            other,
            raw_triangles: raw_triangles(other),
            obb: OrientedBox::from_box(&other.bounding_box(), *geometry_to_bvh),
            geometry_to_bvh: *geometry_to_bvh,
            bvh_to_geometry: geometry_to_bvh.inverse(),
        };
        self.shapecast(&mut query)
    }
}
