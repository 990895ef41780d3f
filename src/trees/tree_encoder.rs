use super::constants::{MAX_LEAF_COUNT, WORDS_PER_NODE};
use super::node::{write_internal, write_leaf};
use super::tree_builder::BuildNode;
use crate::error::BvhError;

/// Packs a build tree into a flat buffer of node records in depth-first pre-order.
pub(crate) fn encode_tree(root: &BuildNode) -> Result<Vec<u32>, BvhError> {
    let _span = tracing::debug_span!("encode_bvh").entered();
    let mut words = vec![0u32; root.node_count() * WORDS_PER_NODE];
    let end = write_node(root, 0, &mut words)?;
    debug_assert_eq!(end, words.len());
    Ok(words)
}

/// Writes `node` at word `n32` and returns the first word after its subtree.
fn write_node(node: &BuildNode, n32: usize, words: &mut [u32]) -> Result<usize, BvhError> {
    match node {
        BuildNode::Leaf {
            bounds,
            offset,
            count,
        } => {
            if *count > MAX_LEAF_COUNT {
                return Err(BvhError::LeafCountOverflow(*count));
            }
            let offset = u32::try_from(*offset)
                .map_err(|_| BvhError::NodeIndexOverflow(*offset as u64))?;
            write_leaf(words, n32, bounds, offset, *count as u16);
            Ok(n32 + WORDS_PER_NODE)
        }
        BuildNode::Internal {
            bounds,
            split_axis,
            left,
            right,
        } => {
            let right_start = write_node(left, n32 + WORDS_PER_NODE, words)?;
            let right_index = u32::try_from(right_start)
                .map_err(|_| BvhError::NodeIndexOverflow(right_start as u64))?;
            write_internal(words, n32, bounds, *split_axis, right_index);
            write_node(right, right_start, words)
        }
    }
}
