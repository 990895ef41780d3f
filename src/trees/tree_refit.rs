use std::collections::HashSet;

use tracing::debug_span;

use super::mesh_bvh::MeshBvh;
use super::node;
use crate::geometry::MeshGeometry;
use crate::utilities::BoundingBox;

struct Refitter<'a> {
    geometry: &'a MeshGeometry,
    indirect_buffer: Option<&'a [u32]>,
    dirty_nodes: Option<&'a HashSet<usize>>,
}

impl Refitter<'_> {
    #[inline]
    fn resolve(&self, i: usize) -> usize {
        match self.indirect_buffer {
            Some(buffer) => buffer[i] as usize,
            None => i,
        }
    }

    fn leaf_bounds(&self, offset: usize, count: usize) -> BoundingBox {
        let mut bounds = BoundingBox::EMPTY;
        for i in offset..offset + count {
            for point in self.geometry.triangle(self.resolve(i)).points() {
                bounds.expand_by_point(point);
            }
        }
        bounds
    }

    /// Recomputes the bounds below `n32` and returns whether this node's stored box changed.
    fn refit_node(&self, words: &mut [u32], byte_offset: usize, n32: usize, force: bool) -> bool {
        if node::is_leaf(words, n32) {
            let offset = node::leaf_offset(words, n32) as usize;
            let count = node::leaf_count(words, n32) as usize;
            let bounds = self.leaf_bounds(offset, count);
            return Self::store_if_changed(words, n32, &bounds);
        }

        let left = node::left_child(n32);
        let right = node::right_child(words, n32);

        let (refit_left, refit_right, force_children) = match self.dirty_nodes {
            Some(dirty) if !force => {
                let includes_left = dirty.contains(&(byte_offset + left * 4));
                let includes_right = dirty.contains(&(byte_offset + right * 4));
                // A marked parent with no marked children refits its whole subtree.
                let force_children = !includes_left && !includes_right;
                (includes_left, includes_right, force_children)
            }
            Some(_) => (true, true, true),
            None => (true, true, false),
        };

        let mut changed = false;
        if refit_left || force_children {
            changed |= self.refit_node(words, byte_offset, left, force_children);
        }
        if refit_right || force_children {
            changed |= self.refit_node(words, byte_offset, right, force_children);
        }
        if !changed {
            return false;
        }

        let bounds = node::node_bounds(words, left).union(&node::node_bounds(words, right));
        Self::store_if_changed(words, n32, &bounds)
    }

    #[inline]
    fn store_if_changed(words: &mut [u32], n32: usize, bounds: &BoundingBox) -> bool {
        if node::node_bounds(words, n32) == *bounds {
            return false;
        }
        node::set_node_bounds(words, n32, bounds);
        true
    }
}

impl MeshBvh {
    /// Recomputes node bounds from the current vertex positions. Topology and triangle ranges are
    /// left untouched.
    ///
    /// With `dirty_nodes`, only the marked nodes are revisited. Node ids are the ones handed to
    /// traversal callbacks; a leaf's ancestors must be marked for it to be reached, and a marked
    /// node none of whose children is marked is refit in full.
    pub fn refit(&mut self, dirty_nodes: Option<&HashSet<usize>>) {
        let _span = debug_span!("refit", roots = self.roots.len()).entered();
        let refitter = Refitter {
            geometry: &self.geometry,
            indirect_buffer: self.indirect_buffer.as_deref(),
            dirty_nodes,
        };
        let mut byte_offset = 0;
        for words in &mut self.roots {
            refitter.refit_node(words, byte_offset, 0, false);
            byte_offset += words.len() * 4;
        }
    }
}
