/// Size in bytes of one packed node record.
pub const BYTES_PER_NODE: usize = 32;
/// Size in 32-bit words of one packed node record.
pub const WORDS_PER_NODE: usize = BYTES_PER_NODE / 4;

/// Value of the high 16 bits of a leaf's last word.
pub const IS_LEAF_FLAG: u32 = 0xFFFF;
/// Largest triangle count a leaf can encode.
pub const MAX_LEAF_COUNT: usize = 0xFFFF;

/// SAH cost of visiting a node.
pub const TRAVERSAL_COST: f32 = 1.25;
/// SAH cost of testing one triangle.
pub const TRIANGLE_INTERSECT_COST: f32 = 1.25;

/// Number of buckets per axis used by the binned SAH split search.
pub const BIN_COUNT: usize = 32;

/// Relative inflation applied to triangle bounds so they survive float rounding, 2^-24.
pub const FLOAT32_EPSILON: f32 = 5.960_464_5e-8;
