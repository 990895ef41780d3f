use serde::{Deserialize, Serialize};

use super::constants::{BYTES_PER_NODE, WORDS_PER_NODE};
use super::mesh_bvh::MeshBvh;
use super::node::{self, Node};
use crate::error::BvhError;
use crate::geometry::{IndexAttribute, IndexBuffer, MeshGeometry};

/// Detached form of a [`MeshBvh`] that can be stored and re-attached to its geometry without a
/// rebuild.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedBvh {
    /// Little-endian byte images of the packed node buffers.
    pub roots: Vec<Vec<u8>>,
    /// The geometry's index, in the order the tree expects.
    pub index: Option<Vec<u32>>,
    pub indirect_buffer: Option<Vec<u32>>,
}

fn root_to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|word| word.to_le_bytes()).collect()
}

fn root_from_bytes(root_index: usize, bytes: &[u8]) -> Result<Vec<u32>, BvhError> {
    if bytes.is_empty() || bytes.len() % BYTES_PER_NODE != 0 {
        return Err(BvhError::InvalidRootBuffer(format!(
            "root {root_index} is {} bytes, not a whole number of {BYTES_PER_NODE} byte nodes",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Checks that every child pointer, split axis and leaf range of a root stays in bounds.
fn validate_root(root_index: usize, words: &[u32], range_len: usize) -> Result<(), BvhError> {
    for n32 in (0..words.len()).step_by(WORDS_PER_NODE) {
        match Node::decode(words, n32) {
            Node::Leaf { offset, count } => {
                let end = offset as usize + count as usize;
                if end > range_len {
                    return Err(BvhError::InvalidRootBuffer(format!(
                        "root {root_index} node {n32} covers triangles {offset}..{end} of {range_len}"
                    )));
                }
            }
            Node::Internal { split_axis, .. } if split_axis >= 3 => {
                return Err(BvhError::InvalidRootBuffer(format!(
                    "root {root_index} node {n32} has split axis {split_axis}"
                )));
            }
            Node::Internal { right, .. } => {
                let left = node::left_child(n32);
                if right <= n32
                    || right % WORDS_PER_NODE != 0
                    || left >= words.len()
                    || right >= words.len()
                {
                    return Err(BvhError::InvalidRootBuffer(format!(
                        "root {root_index} node {n32} points to child {right} outside the buffer"
                    )));
                }
            }
        }
    }
    Ok(())
}

fn validate_indirect_buffer(slots: &[u32], triangle_count: usize) -> Result<(), BvhError> {
    match slots.iter().position(|&slot| slot as usize >= triangle_count) {
        Some(i) => Err(BvhError::InvalidRootBuffer(format!(
            "indirect slot {i} references triangle {} of {triangle_count}",
            slots[i]
        ))),
        None => Ok(()),
    }
}

impl MeshBvh {
    /// Copies the packed tree, the geometry index and the indirect buffer.
    pub fn serialize(&self) -> SerializedBvh {
        SerializedBvh {
            roots: self.roots.iter().map(|words| root_to_bytes(words)).collect(),
            index: self
                .geometry
                .index
                .as_ref()
                .map(|index| index.buffer.to_u32_vec()),
            indirect_buffer: self.indirect_buffer.clone(),
        }
    }

    /// Re-attaches a serialized tree to `geometry`.
    ///
    /// With `set_index` the stored index replaces the geometry's own, which is needed whenever the
    /// geometry was not saved after the build reordered it.
    pub fn deserialize(
        data: &SerializedBvh,
        mut geometry: MeshGeometry,
        set_index: bool,
    ) -> Result<Self, BvhError> {
        if set_index {
            if let Some(index) = &data.index {
                let buffer = IndexBuffer::for_vertex_count(index.clone(), geometry.vertex_count());
                geometry.index = Some(IndexAttribute::new(buffer));
            }
        }
        geometry.validate()?;
        if let Some(slots) = &data.indirect_buffer {
            validate_indirect_buffer(slots, geometry.triangle_count())?;
        }

        let range_len = data
            .indirect_buffer
            .as_ref()
            .map_or_else(|| geometry.triangle_count(), Vec::len);
        let roots = data
            .roots
            .iter()
            .enumerate()
            .map(|(root_index, bytes)| {
                let words = root_from_bytes(root_index, bytes)?;
                validate_root(root_index, &words, range_len)?;
                Ok(words)
            })
            .collect::<Result<Vec<_>, BvhError>>()?;

        Ok(Self {
            geometry,
            roots,
            indirect_buffer: data.indirect_buffer.clone(),
        })
    }
}
