use glam::{Mat4, Vec3};

use super::mesh_bvh::MeshBvh;
use super::tree_intersects_geometry::{collect_range, raw_triangles, OtherGeometry};
use super::tree_shapecast::{
    BoundsTest, NodeContext, RangeVisitor, ShapecastIntersection, TraversalOrder, TriangleRange,
};
use crate::geometry::{ExtendedTriangle, OrientedBox};
use crate::utilities::BoundingBox;

/// Nearest point on a mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClosestPointHit {
    pub point: Vec3,
    pub distance: f32,
    /// Index of the triangle in its geometry.
    pub triangle_index: usize,
}

/// Closest points between this mesh and another one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClosestPointPair {
    /// Point on this mesh, in this mesh's frame.
    pub target: ClosestPointHit,
    /// Point on the other mesh, in the other mesh's frame.
    pub other: ClosestPointHit,
}

struct PointQuery {
    point: Vec3,
    min_squared: f32,
    max_squared: f32,
    best_squared: f32,
    hit: Option<(Vec3, usize)>,
}

impl BoundsTest for PointQuery {
    #[inline]
    fn intersects_bounds(&mut self, _: &BoundingBox, context: NodeContext) -> ShapecastIntersection {
        let score = context.score.unwrap_or(0.0);
        (score < self.best_squared && score < self.max_squared).into()
    }
}

impl RangeVisitor for PointQuery {
    fn intersects_triangle(&mut self, triangle: &ExtendedTriangle, index: usize, _: bool, _: usize) -> bool {
        let closest = triangle.closest_point_to_point(self.point);
        let distance_squared = closest.distance_squared(self.point);
        if distance_squared < self.best_squared && distance_squared <= self.max_squared {
            self.best_squared = distance_squared;
            self.hit = Some((closest, index));
        }
        distance_squared < self.min_squared
    }
}

impl TraversalOrder for PointQuery {
    #[inline]
    fn bounds_traverse_order(&mut self, bounds: &BoundingBox) -> Option<f32> {
        Some(bounds.distance_squared_to_point(self.point))
    }
}

/// Best pair found so far by a mesh versus mesh distance query. Distances are in this mesh's frame.
struct PairState {
    min_distance: f32,
    max_distance: f32,
    best: f32,
    /// Closest points with this triangle index and the other triangle index.
    hit: Option<(Vec3, usize, Vec3, usize)>,
}

impl PairState {
    /// Tests one triangle of the other mesh, already in this mesh's frame, against a set of local
    /// triangles. Returns `true` once a pair is closer than the minimum distance.
    fn test(&mut self, local: &[(usize, ExtendedTriangle)], other_index: usize, other: &ExtendedTriangle) -> bool {
        for (index, triangle) in local {
            let (distance, on_self, on_other) = triangle.distance_to_triangle(other);
            if distance < self.best && distance <= self.max_distance {
                self.best = distance;
                self.hit = Some((on_self, *index, on_other, other_index));
            }
            if distance < self.min_distance {
                return true;
            }
        }
        false
    }
}

struct GeometryDistanceQuery<'a> {
    other: OtherGeometry<'a>,
    raw_triangles: Vec<ExtendedTriangle>,
    obb: OrientedBox,
    geometry_to_bvh: Mat4,
    state: PairState,
}

impl BoundsTest for GeometryDistanceQuery<'_> {
    #[inline]
    fn intersects_bounds(&mut self, _: &BoundingBox, context: NodeContext) -> ShapecastIntersection {
        let score = context.score.unwrap_or(0.0);
        (score < self.state.best && score < self.state.max_distance).into()
    }
}

impl RangeVisitor for GeometryDistanceQuery<'_> {
    fn intersects_range(&mut self, range: &TriangleRange<'_>) -> bool {
        let local = collect_range(range);
        match self.other {
            OtherGeometry::Bvh(other) => {
                let mut leaf = LeafDistance {
                    local,
                    bounds: range.bounds,
                    geometry_to_bvh: self.geometry_to_bvh,
                    state: &mut self.state,
                };
                other.shapecast(&mut leaf)
            }
            OtherGeometry::Raw(_) => {
                for (other_index, triangle) in self.raw_triangles.iter().enumerate() {
                    let triangle = triangle.transformed(&self.geometry_to_bvh);
                    if self.state.test(&local, other_index, &triangle) {
                        return true;
                    }
                }
                false
            }
        }
    }
}

impl TraversalOrder for GeometryDistanceQuery<'_> {
    #[inline]
    fn bounds_traverse_order(&mut self, bounds: &BoundingBox) -> Option<f32> {
        Some(self.obb.distance_to_box(bounds, 0.0))
    }
}

/// Walks the other tree nearest first from one leaf of this tree.
struct LeafDistance<'s> {
    local: Vec<(usize, ExtendedTriangle)>,
    /// Bounds of the leaf in this mesh's frame.
    bounds: BoundingBox,
    geometry_to_bvh: Mat4,
    state: &'s mut PairState,
}

impl BoundsTest for LeafDistance<'_> {
    #[inline]
    fn intersects_bounds(&mut self, _: &BoundingBox, context: NodeContext) -> ShapecastIntersection {
        let score = context.score.unwrap_or(0.0);
        (score < self.state.best && score < self.state.max_distance).into()
    }
}

impl RangeVisitor for LeafDistance<'_> {
    fn intersects_triangle(&mut self, triangle: &ExtendedTriangle, index: usize, _: bool, _: usize) -> bool {
        let triangle = triangle.transformed(&self.geometry_to_bvh);
        self.state.test(&self.local, index, &triangle)
    }
}

impl TraversalOrder for LeafDistance<'_> {
    #[inline]
    fn bounds_traverse_order(&mut self, bounds: &BoundingBox) -> Option<f32> {
        // Scored in this mesh's frame so it compares against the best distance.
        let other = OrientedBox::from_box(bounds, self.geometry_to_bvh);
        Some(other.distance_to_box(&self.bounds, 0.0))
    }
}

impl MeshBvh {
    /// Finds the point on the mesh nearest to `point`.
    ///
    /// Triangles farther than `max_threshold` are ignored, and the search ends as soon as one
    /// closer than `min_threshold` is found. Returns `None` when nothing lies within
    /// `max_threshold`.
    pub fn closest_point_to_point(
        &self,
        point: Vec3,
        min_threshold: f32,
        max_threshold: f32,
    ) -> Option<ClosestPointHit> {
        let mut query = PointQuery {
            point,
            min_squared: min_threshold * min_threshold,
            max_squared: max_threshold * max_threshold,
            best_squared: f32::INFINITY,
            hit: None,
        };
        self.shapecast(&mut query);
        query.hit.map(|(closest, triangle_index)| ClosestPointHit {
            point: closest,
            distance: query.best_squared.sqrt(),
            triangle_index,
        })
    }

    /// Finds the closest pair of points between this mesh and `other`, which is placed in this
    /// mesh's frame by `geometry_to_bvh`.
    ///
    /// Thresholds and distances are measured in this mesh's frame.
    pub fn closest_point_to_geometry<'a>(
        &self,
        other: impl Into<OtherGeometry<'a>>,
        geometry_to_bvh: &Mat4,
        min_threshold: f32,
        max_threshold: f32,
    ) -> Option<ClosestPointPair> {
        let other = other.into();
        let bvh_to_geometry = geometry_to_bvh.inverse();
        let mut query = GeometryDistanceQuery {
            other,
            raw_triangles: raw_triangles(other),
            obb: OrientedBox::from_box(&other.bounding_box(), *geometry_to_bvh),
            geometry_to_bvh: *geometry_to_bvh,
            state: PairState {
                min_distance: min_threshold,
                max_distance: max_threshold,
                best: f32::INFINITY,
                hit: None,
            },
        };
        self.shapecast(&mut query);

        let distance = query.state.best;
        query
            .state
            .hit
            .map(|(on_self, index, on_other, other_index)| ClosestPointPair {
                target: ClosestPointHit {
                    point: on_self,
                    distance,
                    triangle_index: index,
                },
                other: ClosestPointHit {
                    point: bvh_to_geometry.transform_point3(on_other),
                    distance,
                    triangle_index: other_index,
                },
            })
    }
}
