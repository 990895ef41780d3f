use serde::Serialize;
use tracing::error;

use super::constants::{TRAVERSAL_COST, TRIANGLE_INTERSECT_COST};
use super::mesh_bvh::MeshBvh;
use super::node::{self, Node};
use crate::error::BvhError;
use crate::utilities::{BoundingBox, ContainmentType};

/// Inclusive range of an integer statistic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MinMax {
    pub min: usize,
    pub max: usize,
}

/// Shape statistics of one root.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TreeExtremes {
    pub node_count: usize,
    pub leaf_node_count: usize,
    /// Depths of the leaves.
    pub depth: MinMax,
    /// Triangle counts of the leaves.
    pub tris: MinMax,
    /// Internal nodes split on each axis.
    pub splits: [usize; 3],
    /// Unnormalized SAH cost of the tree.
    pub surface_area_score: f32,
}

#[derive(Serialize)]
#[serde(untagged)]
enum JsonNode {
    Leaf {
        bounds: BoundingBox,
        count: u32,
        offset: u32,
    },
    Internal {
        bounds: BoundingBox,
        left: Box<JsonNode>,
        right: Box<JsonNode>,
    },
}

fn traverse_node<F>(words: &[u32], n32: usize, depth: usize, visitor: &mut F)
where
    F: FnMut(usize, &Node, &BoundingBox) -> bool,
{
    let decoded = Node::decode(words, n32);
    let bounds = node::node_bounds(words, n32);
    let stop = visitor(depth, &decoded, &bounds);
    if let Node::Internal { right, .. } = decoded {
        if !stop {
            traverse_node(words, node::left_child(n32), depth + 1, visitor);
            traverse_node(words, right, depth + 1, visitor);
        }
    }
}

fn json_node(words: &[u32], n32: usize) -> JsonNode {
    let bounds = node::node_bounds(words, n32);
    match Node::decode(words, n32) {
        Node::Leaf { offset, count } => JsonNode::Leaf {
            bounds,
            count,
            offset,
        },
        Node::Internal { right, .. } => JsonNode::Internal {
            bounds,
            left: Box::new(json_node(words, node::left_child(n32))),
            right: Box::new(json_node(words, right)),
        },
    }
}

impl MeshBvh {
    /// Depth-first pre-order visit of every node of one root.
    ///
    /// The visitor receives the depth, the decoded node and its bounds. Returning `true` from an
    /// internal node skips its children.
    pub fn traverse<F>(&self, root_index: usize, mut visitor: F)
    where
        F: FnMut(usize, &Node, &BoundingBox) -> bool,
    {
        if let Some(words) = self.roots.get(root_index) {
            traverse_node(words, 0, 0, &mut visitor);
        }
    }

    /// Shape statistics for every root.
    pub fn extremes(&self) -> Vec<TreeExtremes> {
        (0..self.roots.len())
            .map(|root_index| {
                let mut result = TreeExtremes::default();
                let mut depth = (usize::MAX, 0);
                let mut tris = (usize::MAX, 0);
                self.traverse(root_index, |node_depth, decoded, bounds| {
                    let surface_area = bounds.surface_area();
                    result.node_count += 1;
                    match *decoded {
                        Node::Leaf { count, .. } => {
                            let count = count as usize;
                            result.leaf_node_count += 1;
                            depth = (depth.0.min(node_depth), depth.1.max(node_depth));
                            tris = (tris.0.min(count), tris.1.max(count));
                            result.surface_area_score +=
                                surface_area * TRIANGLE_INTERSECT_COST * count as f32;
                        }
                        Node::Internal { split_axis, .. } => {
                            result.splits[split_axis] += 1;
                            result.surface_area_score += surface_area * TRAVERSAL_COST;
                        }
                    }
                    false
                });
                if result.leaf_node_count > 0 {
                    result.depth = MinMax {
                        min: depth.0,
                        max: depth.1,
                    };
                    result.tris = MinMax {
                        min: tris.0,
                        max: tris.1,
                    };
                }
                if !result.surface_area_score.is_finite() {
                    result.surface_area_score = 0.0;
                }
                result
            })
            .collect()
    }

    /// Checks that every leaf encloses its triangles and every node encloses its children.
    ///
    /// Each failure is logged; the result is `false` if any was found.
    pub fn validate_bounds(&self) -> bool {
        let mut valid = true;
        for (root_index, words) in self.roots.iter().enumerate() {
            valid &= self.validate_node(root_index, words, 0);
        }
        valid
    }

    /// Approximate heap footprint of the tree, excluding the geometry.
    pub fn estimate_memory_in_bytes(&self) -> usize {
        let roots: usize = self.roots.iter().map(|words| words.len() * 4).sum();
        let indirect = self.indirect_buffer.as_ref().map_or(0, |buffer| buffer.len() * 4);
        std::mem::size_of::<Self>() + roots + indirect
    }

    fn validate_node(&self, root_index: usize, words: &[u32], n32: usize) -> bool {
        let bounds = node::node_bounds(words, n32);
        let mut valid = true;
        match Node::decode(words, n32) {
            Node::Leaf { offset, count } => {
                for i in offset as usize..(offset + count) as usize {
                    let triangle_index = self.resolve_triangle_index(i);
                    for point in self.geometry.triangle(triangle_index).points() {
                        if !bounds.contains_point(point) {
                            error!(
                                root_index,
                                node = n32 * 4,
                                triangle_index,
                                ?point,
                                ?bounds,
                                "leaf bounds do not contain triangle"
                            );
                            valid = false;
                        }
                    }
                }
            }
            Node::Internal { right, .. } => {
                for child in [node::left_child(n32), right] {
                    let child_bounds = node::node_bounds(words, child);
                    if bounds.contains(&child_bounds) != ContainmentType::Contains {
                        error!(
                            root_index,
                            node = n32 * 4,
                            child = child * 4,
                            ?bounds,
                            ?child_bounds,
                            "node bounds do not contain child"
                        );
                        valid = false;
                    }
                    valid &= self.validate_node(root_index, words, child);
                }
            }
        }
        valid
    }

    /// Nested JSON dump of every root's node structure.
    pub fn to_json(&self) -> Result<String, BvhError> {
        let roots: Vec<JsonNode> = self.roots.iter().map(|words| json_node(words, 0)).collect();
        Ok(serde_json::to_string_pretty(&roots)?)
    }
}
