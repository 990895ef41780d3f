use serde::{Deserialize, Serialize};

use crate::geometry::DrawRange;

/// How a node's triangles are divided between its children.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitStrategy {
    /// Split at the middle of the longest axis of the triangle centroids.
    #[default]
    Center,
    /// Split at the mean centroid along the node's longest axis.
    Average,
    /// Split at the plane minimizing the surface area heuristic.
    Sah,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    pub strategy: SplitStrategy,
    /// Depth at which ranges become leaves regardless of size.
    pub max_depth: usize,
    /// Ranges at or below this triangle count become leaves.
    pub max_leaf_tris: usize,
    /// Order triangles through a permutation buffer instead of reordering the geometry index.
    pub indirect: bool,
    /// Accepted for compatibility. Packed buffers are plain vectors and always shareable.
    pub use_shared_array_buffer: bool,
    /// Log recoverable build problems.
    pub verbose: bool,
    /// Index range to build over instead of the geometry's draw range.
    pub range: Option<DrawRange>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            strategy: SplitStrategy::Center,
            max_depth: 40,
            max_leaf_tris: 10,
            indirect: false,
            use_shared_array_buffer: false,
            verbose: true,
            range: None,
        }
    }
}
