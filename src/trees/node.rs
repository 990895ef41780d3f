use super::constants::{IS_LEAF_FLAG, WORDS_PER_NODE};
use crate::utilities::BoundingBox;

/// Decoded content of a packed node.
///
/// The packed record is eight little-endian 32-bit words. Words 0 to 5 hold the bounds as `f32`
/// (min xyz, max xyz). An internal node stores the right child's word index in word 6 and its
/// split axis in word 7. A leaf stores its first triangle offset in word 6 and
/// `0xFFFF0000 | count` in word 7.
///
/// The left child of an internal node always starts at the next record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Node {
    Leaf { offset: u32, count: u32 },
    Internal { split_axis: usize, right: usize },
}

impl Node {
    /// Decodes the node whose record starts at word `n32`.
    #[inline(always)]
    pub fn decode(words: &[u32], n32: usize) -> Self {
        if is_leaf(words, n32) {
            Node::Leaf {
                offset: leaf_offset(words, n32),
                count: leaf_count(words, n32),
            }
        } else {
            Node::Internal {
                split_axis: split_axis(words, n32),
                right: right_child(words, n32),
            }
        }
    }

    #[inline(always)]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}

#[inline(always)]
pub fn is_leaf(words: &[u32], n32: usize) -> bool {
    words[n32 + 7] >> 16 == IS_LEAF_FLAG
}

#[inline(always)]
pub fn leaf_offset(words: &[u32], n32: usize) -> u32 {
    words[n32 + 6]
}

#[inline(always)]
pub fn leaf_count(words: &[u32], n32: usize) -> u32 {
    words[n32 + 7] & 0xFFFF
}

#[inline(always)]
pub fn left_child(n32: usize) -> usize {
    n32 + WORDS_PER_NODE
}

#[inline(always)]
pub fn right_child(words: &[u32], n32: usize) -> usize {
    words[n32 + 6] as usize
}

#[inline(always)]
pub fn split_axis(words: &[u32], n32: usize) -> usize {
    words[n32 + 7] as usize
}

#[inline(always)]
pub fn node_bounds(words: &[u32], n32: usize) -> BoundingBox {
    let mut data = [0.0f32; 6];
    for (i, value) in data.iter_mut().enumerate() {
        *value = f32::from_bits(words[n32 + i]);
    }
    BoundingBox::from_array(&data)
}

#[inline(always)]
pub fn set_node_bounds(words: &mut [u32], n32: usize, bounds: &BoundingBox) {
    for (i, value) in bounds.to_array().iter().enumerate() {
        words[n32 + i] = value.to_bits();
    }
}

/// Writes a leaf record.
#[inline(always)]
pub fn write_leaf(words: &mut [u32], n32: usize, bounds: &BoundingBox, offset: u32, count: u16) {
    set_node_bounds(words, n32, bounds);
    words[n32 + 6] = offset;
    words[n32 + 7] = (IS_LEAF_FLAG << 16) | count as u32;
}

/// Writes an internal record.
#[inline(always)]
pub fn write_internal(
    words: &mut [u32],
    n32: usize,
    bounds: &BoundingBox,
    split_axis: usize,
    right: u32,
) {
    set_node_bounds(words, n32, bounds);
    words[n32 + 6] = right;
    words[n32 + 7] = split_axis as u32;
}

/// First triangle offset of the subtree at `n32`, found through its left-most leaf.
pub fn subtree_start(words: &[u32], mut n32: usize) -> usize {
    while !is_leaf(words, n32) {
        n32 = left_child(n32);
    }
    leaf_offset(words, n32) as usize
}

/// One past the last triangle offset of the subtree at `n32`, found through its right-most leaf.
pub fn subtree_end(words: &[u32], mut n32: usize) -> usize {
    while !is_leaf(words, n32) {
        n32 = right_child(words, n32);
    }
    (leaf_offset(words, n32) + leaf_count(words, n32)) as usize
}
