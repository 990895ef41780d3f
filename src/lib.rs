//! Bounding volume hierarchies over triangle meshes, stored as packed pointer-free node buffers.

pub mod geometry;
pub mod trees;
pub mod utilities;

mod error;
pub use error::BvhError;

pub use trees::{BuildOptions, MeshBvh, SplitStrategy};
