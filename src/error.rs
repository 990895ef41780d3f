use thiserror::Error;

/// Errors produced while building, encoding, or re-attaching a BVH.
#[derive(Error, Debug)]
pub enum BvhError {
    #[error("geometry has no usable position attribute")]
    MissingPositions,

    #[error("interleaved index attributes are not supported")]
    InterleavedIndex,

    #[error("node index {0} exceeds the 32-bit node index space")]
    NodeIndexOverflow(u64),

    #[error("leaf holds {0} triangles which does not fit the 16-bit leaf count")]
    LeafCountOverflow(usize),

    #[error("a bvhcast is already running on this thread")]
    BvhcastActive,

    #[error("texture encoding requires a single root, found {0}")]
    MultipleRoots(usize),

    #[error("invalid root buffer: {0}")]
    InvalidRootBuffer(String),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}
