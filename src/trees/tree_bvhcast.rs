use std::cell::Cell;
use std::marker::PhantomData;

use glam::Mat4;

use super::mesh_bvh::MeshBvh;
use super::node;
use super::tree_shapecast::TriangleRange;
use crate::error::BvhError;
use crate::geometry::ExtendedTriangle;
use crate::utilities::BoundingBox;

thread_local! {
    static BVHCAST_ACTIVE: Cell<bool> = const { Cell::new(false) };
}

/// Exclusive token for one dual tree cast on the current thread. Released on drop.
struct BvhcastGuard {
    _not_send: PhantomData<*const ()>,
}

impl BvhcastGuard {
    fn acquire() -> Result<Self, BvhError> {
        BVHCAST_ACTIVE.with(|active| {
            if active.get() {
                return Err(BvhError::BvhcastActive);
            }
            active.set(true);
            Ok(Self {
                _not_send: PhantomData,
            })
        })
    }
}

impl Drop for BvhcastGuard {
    fn drop(&mut self) {
        BVHCAST_ACTIVE.with(|active| active.set(false));
    }
}

/// Two leaves, one from each tree, whose bounds overlap.
#[derive(Clone, Copy, Debug)]
pub struct RangePair<'a> {
    /// Leaf of the tree the cast was started on.
    pub this: TriangleRange<'a>,
    /// Leaf of the other tree, in the other tree's frame.
    pub other: TriangleRange<'a>,
    /// Other tree to this tree transform.
    pub matrix_to_local: Mat4,
}

/// Receives overlapping leaf pairs of a dual tree cast. Returning `true` stops the cast.
pub trait BvhcastVisitor {
    /// By default pairs every triangle of `other`, moved into this tree's frame, with every
    /// triangle of `this` and forwards them to [`BvhcastVisitor::intersects_triangles`].
    fn intersects_ranges(&mut self, pair: &RangePair<'_>) -> bool {
        for (other_index, other) in pair.other.triangles() {
            let other = other.transformed(&pair.matrix_to_local);
            for (index, triangle) in pair.this.triangles() {
                if self.intersects_triangles(&triangle, &other, index, other_index) {
                    return true;
                }
            }
        }
        false
    }

    fn intersects_triangles(
        &mut self,
        _triangle: &ExtendedTriangle,
        _other: &ExtendedTriangle,
        _triangle_index: usize,
        _other_index: usize,
    ) -> bool {
        false
    }
}

/// One root of one of the two trees.
#[derive(Clone, Copy)]
struct CastRoot<'a> {
    bvh: &'a MeshBvh,
    words: &'a [u32],
    byte_offset: usize,
}

impl<'a> CastRoot<'a> {
    #[inline]
    fn bounds(&self, n32: usize) -> BoundingBox {
        node::node_bounds(self.words, n32)
    }

    #[inline]
    fn is_leaf(&self, n32: usize) -> bool {
        node::is_leaf(self.words, n32)
    }

    fn leaf_range(&self, n32: usize, depth: usize) -> TriangleRange<'a> {
        TriangleRange {
            bvh: self.bvh,
            offset: node::leaf_offset(self.words, n32) as usize,
            count: node::leaf_count(self.words, n32) as usize,
            contained: false,
            depth,
            node_index: self.byte_offset + n32 * 4,
            bounds: self.bounds(n32),
        }
    }
}

/// A node of one tree during the dual traversal.
#[derive(Clone, Copy)]
struct CastNode<'a> {
    root: CastRoot<'a>,
    n32: usize,
    depth: usize,
}

impl<'a> CastNode<'a> {
    #[inline]
    fn child(&self, n32: usize) -> Self {
        Self {
            root: self.root,
            n32,
            depth: self.depth + 1,
        }
    }

    #[inline]
    fn children(&self) -> (Self, Self) {
        (
            self.child(node::left_child(self.n32)),
            self.child(node::right_child(self.root.words, self.n32)),
        )
    }

    #[inline]
    fn bounds(&self) -> BoundingBox {
        self.root.bounds(self.n32)
    }
}

struct DualTraversal<'v, V> {
    visitor: &'v mut V,
    matrix_to_local: Mat4,
}

impl<V: BvhcastVisitor> DualTraversal<'_, V> {
    /// Descends `node2` while `node1` stays put, swapping roles whenever only one side can
    /// descend further.
    ///
    /// `curr_box` is the bounds of `node1` expressed in the frame of `node2`'s tree.
    /// `matrix2to1` moves boxes of `node2`'s tree into `node1`'s tree. `reversed` is set while
    /// `node1` belongs to the other tree.
    fn traverse(
        &mut self,
        node1: CastNode<'_>,
        node2: CastNode<'_>,
        matrix2to1: &Mat4,
        matrix1to2: &Mat4,
        curr_box: &BoundingBox,
        reversed: bool,
    ) -> bool {
        let is_leaf1 = node1.root.is_leaf(node1.n32);
        let is_leaf2 = node2.root.is_leaf(node2.n32);

        if is_leaf1 && is_leaf2 {
            let range1 = node1.root.leaf_range(node1.n32, node1.depth);
            let range2 = node2.root.leaf_range(node2.n32, node2.depth);
            let (this, other) = if reversed { (range2, range1) } else { (range1, range2) };
            let pair = RangePair {
                this,
                other,
                matrix_to_local: self.matrix_to_local,
            };
            return self.visitor.intersects_ranges(&pair);
        }

        if is_leaf2 {
            let new_box = node2.bounds().transformed(matrix2to1);
            return self.swap_into(node2, node1, &new_box, matrix2to1, matrix1to2, reversed);
        }

        let (left2, right2) = node2.children();
        let left_box2 = left2.bounds();
        let right_box2 = right2.bounds();
        let left_intersects = curr_box.intersects(&left_box2);
        let right_intersects = curr_box.intersects(&right_box2);

        if left_intersects && right_intersects {
            return self.traverse(node1, left2, matrix2to1, matrix1to2, curr_box, reversed)
                || self.traverse(node1, right2, matrix2to1, matrix1to2, curr_box, reversed);
        }

        let (child2, child_box2) = if left_intersects {
            (left2, left_box2)
        } else if right_intersects {
            (right2, right_box2)
        } else {
            return false;
        };

        if is_leaf1 {
            self.traverse(node1, child2, matrix2to1, matrix1to2, curr_box, reversed)
        } else {
            let new_box = child_box2.transformed(matrix2to1);
            self.swap_into(child2, node1, &new_box, matrix2to1, matrix1to2, reversed)
        }
    }

    /// Continues with `node` as the held node and descends the children of `internal`, whose
    /// tree's frame `node_box` is expressed in.
    fn swap_into(
        &mut self,
        node: CastNode<'_>,
        internal: CastNode<'_>,
        node_box: &BoundingBox,
        matrix_node_to_internal: &Mat4,
        matrix_internal_to_node: &Mat4,
        reversed: bool,
    ) -> bool {
        let (left, right) = internal.children();
        let intersects_left = node_box.intersects(&left.bounds());
        let intersects_right = node_box.intersects(&right.bounds());
        (intersects_left
            && self.traverse(
                node,
                left,
                matrix_internal_to_node,
                matrix_node_to_internal,
                node_box,
                !reversed,
            ))
            || (intersects_right
                && self.traverse(
                    node,
                    right,
                    matrix_internal_to_node,
                    matrix_node_to_internal,
                    node_box,
                    !reversed,
                ))
    }
}

impl MeshBvh {
    /// Walks this tree and `other` together and reports every pair of leaves whose bounds
    /// overlap once `other` is placed in this tree's frame by `matrix_to_local`.
    ///
    /// Returns `Ok(true)` when the visitor stopped the cast. Starting a cast from inside a
    /// visitor of another cast on the same thread fails with [`BvhError::BvhcastActive`].
    pub fn bvhcast<V: BvhcastVisitor>(
        &self,
        other: &MeshBvh,
        matrix_to_local: &Mat4,
        visitor: &mut V,
    ) -> Result<bool, BvhError> {
        let _guard = BvhcastGuard::acquire()?;
        let inverse = matrix_to_local.inverse();
        let mut traversal = DualTraversal {
            visitor,
            matrix_to_local: *matrix_to_local,
        };

        for (byte_offset1, words1) in self.root_byte_offsets() {
            let root1 = CastRoot {
                bvh: self,
                words: words1,
                byte_offset: byte_offset1,
            };
            let local_box = root1.bounds(0).transformed(&inverse);
            for (byte_offset2, words2) in other.root_byte_offsets() {
                let root2 = CastRoot {
                    bvh: other,
                    words: words2,
                    byte_offset: byte_offset2,
                };
                let node1 = CastNode {
                    root: root1,
                    n32: 0,
                    depth: 0,
                };
                let node2 = CastNode {
                    root: root2,
                    n32: 0,
                    depth: 0,
                };
                if traversal.traverse(node1, node2, matrix_to_local, &inverse, &local_box, false) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}
