mod build_options;
pub use self::build_options::*;

mod constants;
pub use self::constants::*;

mod gpu_textures;
pub use self::gpu_textures::*;

mod mesh_bvh;
pub use self::mesh_bvh::*;

pub mod node;
pub use self::node::Node;

mod tree_bounds;
mod tree_builder;
mod tree_encoder;
mod tree_split;

mod tree_bvhcast;
pub use self::tree_bvhcast::{BvhcastVisitor, RangePair};

mod tree_closest_point;
pub use self::tree_closest_point::{ClosestPointHit, ClosestPointPair};

mod tree_diagnostics;
pub use self::tree_diagnostics::{MinMax, TreeExtremes};

mod tree_intersects_geometry;
pub use self::tree_intersects_geometry::OtherGeometry;

mod tree_ray_cast;
pub use self::tree_ray_cast::*;

mod tree_refit;

mod tree_serialization;
pub use self::tree_serialization::SerializedBvh;

mod tree_shapecast;
pub use self::tree_shapecast::*;

mod tree_volume_query;

#[cfg(test)]
pub(crate) mod test_utils;
