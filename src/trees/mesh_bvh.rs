use glam::Vec3;

use super::build_options::BuildOptions;
use super::constants::BYTES_PER_NODE;
use super::node::node_bounds;
use super::tree_builder::build_packed_roots;
use crate::error::BvhError;
use crate::geometry::{ExtendedTriangle, MeshGeometry, Triangle};
use crate::utilities::BoundingBox;

/// A bounding volume hierarchy over the triangles of one mesh.
///
/// The tree is stored as one packed buffer of 32-byte node records per root. The struct is defined
/// here and extended with `impl MeshBvh` blocks in the sibling `tree_*` modules.
#[derive(Clone, Debug)]
pub struct MeshBvh {
    pub(crate) geometry: MeshGeometry,
    /// Packed node records per root, as 32-bit words.
    pub(crate) roots: Vec<Vec<u32>>,
    /// Range position to source triangle. Present only in indirect mode.
    pub(crate) indirect_buffer: Option<Vec<u32>>,
}

impl MeshBvh {
    /// Builds a BVH over `geometry`.
    ///
    /// Unless `options.indirect` is set the geometry's index is reordered to match the tree, and a
    /// non-indexed geometry receives a generated index first.
    pub fn new(geometry: MeshGeometry, options: &BuildOptions) -> Result<Self, BvhError> {
        Self::build(geometry, options, None)
    }

    /// Builds a BVH and reports the fraction of triangles placed into leaves as it goes.
    pub fn with_progress(
        geometry: MeshGeometry,
        options: &BuildOptions,
        mut on_progress: impl FnMut(f32),
    ) -> Result<Self, BvhError> {
        Self::build(geometry, options, Some(&mut on_progress))
    }

    fn build(
        mut geometry: MeshGeometry,
        options: &BuildOptions,
        on_progress: Option<&mut dyn FnMut(f32)>,
    ) -> Result<Self, BvhError> {
        let built = build_packed_roots(&mut geometry, options, on_progress)?;
        Ok(Self {
            geometry,
            roots: built.roots,
            indirect_buffer: built.indirect_buffer,
        })
    }

    #[inline]
    pub fn geometry(&self) -> &MeshGeometry {
        &self.geometry
    }

    /// Mutable access to the geometry. After moving vertices call [`MeshBvh::refit`]; changing
    /// the index or triangle count requires a rebuild.
    #[inline]
    pub fn geometry_mut(&mut self) -> &mut MeshGeometry {
        &mut self.geometry
    }

    pub fn into_geometry(self) -> MeshGeometry {
        self.geometry
    }

    /// Moves one vertex. The tree bounds are stale until the next refit.
    #[inline]
    pub fn set_position(&mut self, vertex: usize, position: Vec3) {
        self.geometry.set_position(vertex, position);
    }

    #[inline]
    pub fn is_indirect(&self) -> bool {
        self.indirect_buffer.is_some()
    }

    #[inline]
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Packed node records of every root.
    #[inline]
    pub fn roots(&self) -> &[Vec<u32>] {
        &self.roots
    }

    pub fn indirect_buffer(&self) -> Option<&[u32]> {
        self.indirect_buffer.as_deref()
    }

    /// Maps a position in a root's triangle range to the triangle index in the geometry.
    #[inline(always)]
    pub fn resolve_triangle_index(&self, i: usize) -> usize {
        match &self.indirect_buffer {
            Some(buffer) => buffer[i] as usize,
            None => i,
        }
    }

    /// Byte offset of each root within the concatenation of all roots.
    ///
    /// Node identifiers handed to callbacks are `root byte offset + node byte offset`, unique
    /// across roots.
    pub(crate) fn root_byte_offsets(&self) -> impl Iterator<Item = (usize, &[u32])> + '_ {
        let mut byte_offset = 0;
        self.roots.iter().map(move |root| {
            let start = byte_offset;
            byte_offset += root.len() * 4;
            (start, root.as_slice())
        })
    }

    /// Triangle at position `i` of a root range.
    #[inline(always)]
    pub(crate) fn range_triangle(&self, i: usize) -> Triangle {
        self.geometry.triangle(self.resolve_triangle_index(i))
    }

    #[inline(always)]
    pub(crate) fn range_extended_triangle(&self, i: usize) -> ExtendedTriangle {
        ExtendedTriangle::new(self.range_triangle(i))
    }

    pub fn node_count(&self) -> usize {
        self.roots.iter().map(|root| root.len() * 4 / BYTES_PER_NODE).sum()
    }

    /// Union of the root bounds.
    pub fn bounding_box(&self) -> BoundingBox {
        let mut bounds = BoundingBox::EMPTY;
        for root in &self.roots {
            if !root.is_empty() {
                bounds = bounds.union(&node_bounds(root, 0));
            }
        }
        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::IndexBuffer;
    use crate::trees::build_options::SplitStrategy;
    use crate::trees::node::Node;
    use crate::trees::test_utils::{random_indexed_soup, unit_cube};

    #[test]
    fn single_triangle_is_one_leaf() {
        let geometry = MeshGeometry::new(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        let options = BuildOptions {
            max_depth: 0,
            verbose: false,
            ..Default::default()
        };
        let bvh = MeshBvh::new(geometry, &options).unwrap();
        assert_eq!(bvh.root_count(), 1);
        assert_eq!(bvh.node_count(), 1);
        assert_eq!(Node::decode(&bvh.roots()[0], 0), Node::Leaf { offset: 0, count: 1 });
        // The generated index is 16-bit.
        assert!(matches!(
            bvh.geometry().index.as_ref().map(|i| &i.buffer),
            Some(IndexBuffer::U16(_))
        ));
    }

    #[test]
    fn missing_positions_fail_the_build() {
        let result = MeshBvh::new(MeshGeometry::default(), &BuildOptions::default());
        assert!(matches!(result, Err(BvhError::MissingPositions)));
    }

    #[test]
    fn indirect_mode_keeps_the_index() {
        let geometry = random_indexed_soup(200, 9);
        let original = geometry.index.clone();
        let options = BuildOptions {
            indirect: true,
            ..Default::default()
        };
        let bvh = MeshBvh::new(geometry, &options).unwrap();
        assert_eq!(bvh.geometry().index, original);
        let mut permutation: Vec<u32> = bvh.indirect_buffer().unwrap().to_vec();
        assert_ne!(permutation, (0..200).collect::<Vec<u32>>());
        permutation.sort_unstable();
        assert_eq!(permutation, (0..200).collect::<Vec<u32>>());
    }

    #[test]
    fn cube_bounds() {
        let options = BuildOptions {
            strategy: SplitStrategy::Sah,
            max_leaf_tris: 4,
            ..Default::default()
        };
        let bvh = MeshBvh::new(unit_cube(), &options).unwrap();
        let bounds = bvh.bounding_box();
        assert!(bounds.min.distance(Vec3::splat(-0.5)) < 1e-5);
        assert!(bounds.max.distance(Vec3::splat(0.5)) < 1e-5);
    }

    #[test]
    fn groups_build_one_root_each() {
        let mut geometry = random_indexed_soup(30, 4);
        geometry.add_group(0, 30, 0);
        geometry.add_group(30, 60, 1);
        let bvh = MeshBvh::new(geometry, &BuildOptions::default()).unwrap();
        assert_eq!(bvh.root_count(), 2);
        let offsets: Vec<usize> = bvh.root_byte_offsets().map(|(offset, _)| offset).collect();
        assert_eq!(offsets[0], 0);
        assert_eq!(offsets[1], bvh.roots()[0].len() * 4);
    }
}
