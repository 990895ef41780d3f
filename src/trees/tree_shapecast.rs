use super::mesh_bvh::MeshBvh;
use super::node;
use crate::geometry::ExtendedTriangle;
use crate::utilities::BoundingBox;

/// Result of testing a query shape against a node's bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapecastIntersection {
    /// Skip the subtree.
    NotIntersected,
    /// Descend into the subtree.
    Intersected,
    /// The shape encloses the subtree; its whole triangle range is reported at once.
    Contained,
}

impl From<bool> for ShapecastIntersection {
    #[inline]
    fn from(intersects: bool) -> Self {
        if intersects {
            ShapecastIntersection::Intersected
        } else {
            ShapecastIntersection::NotIntersected
        }
    }
}

/// Where in the tree a bounds test happens.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeContext {
    pub is_leaf: bool,
    /// Score from [`TraversalOrder::bounds_traverse_order`], if one was computed.
    pub score: Option<f32>,
    pub depth: usize,
    /// Byte offset of the node across all roots.
    pub node_index: usize,
}

/// A contiguous run of triangles reached by a shapecast.
#[derive(Clone, Copy, Debug)]
pub struct TriangleRange<'a> {
    pub bvh: &'a MeshBvh,
    /// First range position. Use [`MeshBvh::resolve_triangle_index`] to map positions to triangles.
    pub offset: usize,
    pub count: usize,
    /// True when the range is a whole subtree reported through [`ShapecastIntersection::Contained`].
    pub contained: bool,
    pub depth: usize,
    pub node_index: usize,
    pub bounds: BoundingBox,
}

impl<'a> TriangleRange<'a> {
    /// Geometry triangle indices of the range.
    pub fn triangle_indices(&self) -> impl Iterator<Item = usize> + 'a {
        let bvh = self.bvh;
        (self.offset..self.offset + self.count).map(move |i| bvh.resolve_triangle_index(i))
    }

    /// Triangles of the range paired with their geometry triangle index.
    pub fn triangles(&self) -> impl Iterator<Item = (usize, ExtendedTriangle)> + 'a {
        let bvh = self.bvh;
        (self.offset..self.offset + self.count)
            .map(move |i| (bvh.resolve_triangle_index(i), bvh.range_extended_triangle(i)))
    }
}

/// Decides which subtrees a shapecast descends into.
pub trait BoundsTest {
    fn intersects_bounds(&mut self, bounds: &BoundingBox, context: NodeContext) -> ShapecastIntersection;
}

/// Receives the triangle ranges a shapecast reaches. Returning `true` stops the traversal.
pub trait RangeVisitor {
    /// Called once per reached leaf or contained subtree. By default forwards every triangle to
    /// [`RangeVisitor::intersects_triangle`].
    fn intersects_range(&mut self, range: &TriangleRange<'_>) -> bool {
        for (index, triangle) in range.triangles() {
            if self.intersects_triangle(&triangle, index, range.contained, range.depth) {
                return true;
            }
        }
        false
    }

    fn intersects_triangle(
        &mut self,
        _triangle: &ExtendedTriangle,
        _triangle_index: usize,
        _contained: bool,
        _depth: usize,
    ) -> bool {
        false
    }
}

/// Orders sibling visits. Lower scores are visited first.
pub trait TraversalOrder {
    fn bounds_traverse_order(&mut self, _bounds: &BoundingBox) -> Option<f32> {
        None
    }
}

/// Everything a shapecast needs from its caller.
pub trait ShapecastCallbacks: BoundsTest + RangeVisitor + TraversalOrder {}

impl<T: BoundsTest + RangeVisitor + TraversalOrder> ShapecastCallbacks for T {}

impl MeshBvh {
    fn shapecast_node<C: ShapecastCallbacks>(
        &self,
        root: &[u32],
        root_byte_offset: usize,
        n32: usize,
        depth: usize,
        callbacks: &mut C,
    ) -> bool {
        if node::is_leaf(root, n32) {
            let range = TriangleRange {
                bvh: self,
                offset: node::leaf_offset(root, n32) as usize,
                count: node::leaf_count(root, n32) as usize,
                contained: false,
                depth,
                node_index: root_byte_offset + n32 * 4,
                bounds: node::node_bounds(root, n32),
            };
            return callbacks.intersects_range(&range);
        }

        let mut c1 = node::left_child(n32);
        let mut c2 = node::right_child(root, n32);
        let mut box1 = node::node_bounds(root, c1);
        let mut box2 = node::node_bounds(root, c2);
        let mut score1 = callbacks.bounds_traverse_order(&box1);
        let mut score2 = callbacks.bounds_traverse_order(&box2);
        if let (Some(s1), Some(s2)) = (score1, score2) {
            if s2 < s1 {
                std::mem::swap(&mut c1, &mut c2);
                std::mem::swap(&mut box1, &mut box2);
                std::mem::swap(&mut score1, &mut score2);
            }
        }

        for (child, bounds, score) in [(c1, box1, score1), (c2, box2, score2)] {
            let node_index = root_byte_offset + child * 4;
            let context = NodeContext {
                is_leaf: node::is_leaf(root, child),
                score,
                depth: depth + 1,
                node_index,
            };
            let stop = match callbacks.intersects_bounds(&bounds, context) {
                ShapecastIntersection::NotIntersected => false,
                ShapecastIntersection::Intersected => {
                    self.shapecast_node(root, root_byte_offset, child, depth + 1, callbacks)
                }
                ShapecastIntersection::Contained => {
                    let offset = node::subtree_start(root, child);
                    let end = node::subtree_end(root, child);
                    let range = TriangleRange {
                        bvh: self,
                        offset,
                        count: end - offset,
                        contained: true,
                        depth: depth + 1,
                        node_index,
                        bounds,
                    };
                    callbacks.intersects_range(&range)
                }
            };
            if stop {
                return true;
            }
        }
        false
    }

    /// Generic callback driven traversal of every root.
    ///
    /// Root bounds are not tested; children are tested through [`BoundsTest`] and visited in
    /// [`TraversalOrder`] score order. Returns `true` as soon as a [`RangeVisitor`] callback does.
    pub fn shapecast<C: ShapecastCallbacks>(&self, callbacks: &mut C) -> bool {
        for (root_byte_offset, root) in self.root_byte_offsets() {
            if self.shapecast_node(root, root_byte_offset, 0, 0, callbacks) {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trees::build_options::BuildOptions;
    use crate::trees::test_utils::random_triangle_soup;
    use crate::utilities::ContainmentType;
    use glam::Vec3;

    /// Collects every triangle inside a query box, using `Contained` for enclosed subtrees.
    struct BoxCollector {
        query: BoundingBox,
        found: Vec<usize>,
        contained_ranges: usize,
    }

    impl BoundsTest for BoxCollector {
        fn intersects_bounds(&mut self, bounds: &BoundingBox, _: NodeContext) -> ShapecastIntersection {
            match self.query.contains(bounds) {
                ContainmentType::Disjoint => ShapecastIntersection::NotIntersected,
                ContainmentType::Intersects => ShapecastIntersection::Intersected,
                ContainmentType::Contains => ShapecastIntersection::Contained,
            }
        }
    }

    impl RangeVisitor for BoxCollector {
        fn intersects_range(&mut self, range: &TriangleRange<'_>) -> bool {
            if range.contained {
                self.contained_ranges += 1;
            }
            for (index, triangle) in range.triangles() {
                if self.query.intersects(&triangle.triangle.bounding_box()) {
                    self.found.push(index);
                }
            }
            false
        }
    }

    impl TraversalOrder for BoxCollector {}

    #[test]
    fn contained_subtrees_report_whole_ranges() {
        let geometry = random_triangle_soup(400, 31);
        let bvh = MeshBvh::new(geometry, &BuildOptions::default()).unwrap();
        let query = BoundingBox::new(Vec3::splat(-0.8), Vec3::splat(0.8));
        let mut collector = BoxCollector {
            query,
            found: Vec::new(),
            contained_ranges: 0,
        };
        assert!(!bvh.shapecast(&mut collector));

        let mut expected: Vec<usize> = (0..bvh.geometry().triangle_count())
            .filter(|&i| query.intersects(&bvh.geometry().triangle(i).bounding_box()))
            .collect();
        let mut found = collector.found.clone();
        found.sort_unstable();
        expected.sort_unstable();
        assert_eq!(found, expected);
        assert!(collector.contained_ranges > 0);
    }

    /// Records visit order and stops on the first triangle.
    struct FirstTriangle {
        target: Vec3,
        depths: Vec<usize>,
        hit: Option<usize>,
    }

    impl BoundsTest for FirstTriangle {
        fn intersects_bounds(&mut self, _: &BoundingBox, context: NodeContext) -> ShapecastIntersection {
            self.depths.push(context.depth);
            assert!(context.score.is_some());
            ShapecastIntersection::Intersected
        }
    }

    impl RangeVisitor for FirstTriangle {
        fn intersects_triangle(&mut self, _: &ExtendedTriangle, index: usize, _: bool, _: usize) -> bool {
            self.hit = Some(index);
            true
        }
    }

    impl TraversalOrder for FirstTriangle {
        fn bounds_traverse_order(&mut self, bounds: &BoundingBox) -> Option<f32> {
            Some(bounds.distance_squared_to_point(self.target))
        }
    }

    #[test]
    fn ordered_traversal_stops_early() {
        let geometry = random_triangle_soup(400, 37);
        let bvh = MeshBvh::new(geometry, &BuildOptions::default()).unwrap();
        let mut callbacks = FirstTriangle {
            target: Vec3::new(0.9, 0.9, 0.9),
            depths: Vec::new(),
            hit: None,
        };
        assert!(bvh.shapecast(&mut callbacks));
        // Descending nearest-first straight to a leaf visits one node per level.
        assert!(callbacks.depths.windows(2).all(|w| w[1] == w[0] + 1));
        assert!(callbacks.hit.unwrap() < bvh.geometry().triangle_count());
    }
}
