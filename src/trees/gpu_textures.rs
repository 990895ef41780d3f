use super::constants::WORDS_PER_NODE;
use super::mesh_bvh::MeshBvh;
use super::node::{self, Node};
use crate::error::BvhError;

/// A single root tree laid out as two square textures for shader traversal.
///
/// Texels past the last node are zero.
#[derive(Clone, Debug, PartialEq)]
pub struct BvhTextures {
    /// Side of the RGBA32F bounds texture. Each node takes two texels, min then max, with an
    /// unused fourth channel.
    pub bounds_dimension: usize,
    pub bounds: Vec<f32>,
    /// Side of the RG32UI contents texture. Each node takes one texel: `[0xFFFF0000 | count,
    /// offset]` for a leaf, `[split axis, right child node index]` otherwise.
    pub contents_dimension: usize,
    pub contents: Vec<u32>,
}

impl BvhTextures {
    pub fn from_bvh(bvh: &MeshBvh) -> Result<Self, BvhError> {
        let [words] = bvh.roots() else {
            return Err(BvhError::MultipleRoots(bvh.root_count()));
        };
        let node_count = words.len() / WORDS_PER_NODE;

        let bounds_dimension = 2 * ((node_count as f64 / 2.0).sqrt().ceil() as usize);
        let contents_dimension = (node_count as f64).sqrt().ceil() as usize;
        let mut bounds = vec![0.0f32; 4 * bounds_dimension * bounds_dimension];
        let mut contents = vec![0u32; 2 * contents_dimension * contents_dimension];

        for i in 0..node_count {
            let n32 = i * WORDS_PER_NODE;
            let node_bounds = node::node_bounds(words, n32);
            for axis in 0..3 {
                bounds[8 * i + axis] = node_bounds.min[axis];
                bounds[8 * i + 4 + axis] = node_bounds.max[axis];
            }
            let texel = match Node::decode(words, n32) {
                Node::Leaf { offset, count } => [0xFFFF_0000 | count, offset],
                Node::Internal { split_axis, right } => {
                    [split_axis as u32, (right / WORDS_PER_NODE) as u32]
                }
            };
            contents[2 * i..2 * i + 2].copy_from_slice(&texel);
        }

        Ok(Self {
            bounds_dimension,
            bounds,
            contents_dimension,
            contents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trees::build_options::BuildOptions;
    use crate::trees::test_utils::{random_triangle_soup, unit_cube};

    #[test]
    fn encodes_every_node() {
        let bvh = MeshBvh::new(random_triangle_soup(100, 71), &BuildOptions::default()).unwrap();
        let textures = BvhTextures::from_bvh(&bvh).unwrap();
        let node_count = bvh.node_count();
        assert!(textures.bounds_dimension * textures.bounds_dimension >= 2 * node_count);
        assert_eq!(textures.bounds_dimension % 2, 0);
        assert!(textures.contents_dimension * textures.contents_dimension >= node_count);

        let words = &bvh.roots()[0];
        let root_bounds = node::node_bounds(words, 0);
        assert_eq!(textures.bounds[0..3], root_bounds.min.to_array());
        assert_eq!(textures.bounds[4..7], root_bounds.max.to_array());

        let mut leaf_triangles = 0;
        for i in 0..node_count {
            let [first, second] = [textures.contents[2 * i], textures.contents[2 * i + 1]];
            if first >> 16 == 0xFFFF {
                leaf_triangles += first & 0xFFFF;
            } else {
                assert!(first < 3);
                // Right children always come after the node and its left child.
                assert!(second as usize > i + 1 && (second as usize) < node_count);
            }
        }
        assert_eq!(leaf_triangles, 100);
    }

    #[test]
    fn single_leaf_tree() {
        let bvh = MeshBvh::new(
            unit_cube(),
            &BuildOptions {
                max_leaf_tris: 12,
                ..BuildOptions::default()
            },
        )
        .unwrap();
        let textures = BvhTextures::from_bvh(&bvh).unwrap();
        assert_eq!(textures.bounds_dimension, 2);
        assert_eq!(textures.contents_dimension, 1);
        assert_eq!(textures.contents, vec![0xFFFF_000C, 0]);
    }

    #[test]
    fn rejects_multiple_roots() {
        let mut geometry = random_triangle_soup(20, 72);
        geometry.add_group(0, 30, 0);
        geometry.add_group(30, 30, 1);
        let bvh = MeshBvh::new(geometry, &BuildOptions::default()).unwrap();
        assert!(matches!(BvhTextures::from_bvh(&bvh), Err(BvhError::MultipleRoots(2))));
    }
}
