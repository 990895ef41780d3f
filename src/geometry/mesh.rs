use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::triangle::Triangle;
use crate::error::BvhError;
use crate::utilities::BoundingBox;

/// Vertex positions stored as flat float triples, optionally interleaved with other attributes.
///
/// Vertex `i` occupies `data[offset + i * stride..offset + i * stride + 3]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionAttribute {
    pub data: Vec<f32>,
    /// Distance in floats between consecutive vertices.
    pub stride: usize,
    /// Float offset of the first position component.
    pub offset: usize,
}

impl PositionAttribute {
    /// Tightly packed `xyz` triples.
    pub fn new(data: Vec<f32>) -> Self {
        Self {
            data,
            stride: 3,
            offset: 0,
        }
    }

    pub fn interleaved(data: Vec<f32>, stride: usize, offset: usize) -> Self {
        Self {
            data,
            stride,
            offset,
        }
    }

    /// Number of complete vertices stored.
    pub fn count(&self) -> usize {
        if self.stride == 0 || self.data.len() < self.offset + 3 {
            return 0;
        }
        (self.data.len() - self.offset - 3) / self.stride + 1
    }

    #[inline(always)]
    pub fn get(&self, index: usize) -> Vec3 {
        let start = self.offset + index * self.stride;
        Vec3::new(self.data[start], self.data[start + 1], self.data[start + 2])
    }

    #[inline(always)]
    pub fn set(&mut self, index: usize, value: Vec3) {
        let start = self.offset + index * self.stride;
        self.data[start] = value.x;
        self.data[start + 1] = value.y;
        self.data[start + 2] = value.z;
    }
}

/// Triangle index storage. The width is chosen by the vertex count.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum IndexBuffer {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexBuffer {
    /// Largest vertex count that is still indexed with 16 bits.
    pub const U16_VERTEX_LIMIT: usize = 65535;

    /// Stores `indices` in 16 bits when `vertex_count` allows it.
    pub fn for_vertex_count(indices: Vec<u32>, vertex_count: usize) -> Self {
        if vertex_count > Self::U16_VERTEX_LIMIT {
            IndexBuffer::U32(indices)
        } else {
            IndexBuffer::U16(indices.into_iter().map(|i| i as u16).collect())
        }
    }

    /// Identity index `0..count` sized for `count` vertices.
    pub fn identity(count: usize) -> Self {
        Self::for_vertex_count((0..count as u32).collect(), count)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        match self {
            IndexBuffer::U16(data) => data.len(),
            IndexBuffer::U32(data) => data.len(),
        }
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline(always)]
    pub fn get(&self, index: usize) -> u32 {
        match self {
            IndexBuffer::U16(data) => data[index] as u32,
            IndexBuffer::U32(data) => data[index],
        }
    }

    #[inline(always)]
    pub fn swap(&mut self, a: usize, b: usize) {
        match self {
            IndexBuffer::U16(data) => data.swap(a, b),
            IndexBuffer::U32(data) => data.swap(a, b),
        }
    }

    pub fn to_u32_vec(&self) -> Vec<u32> {
        match self {
            IndexBuffer::U16(data) => data.iter().map(|&i| i as u32).collect(),
            IndexBuffer::U32(data) => data.clone(),
        }
    }
}

/// Index attribute. Only a stride of one (non-interleaved) can be used for a build.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexAttribute {
    pub buffer: IndexBuffer,
    pub stride: usize,
}

impl IndexAttribute {
    pub fn new(buffer: IndexBuffer) -> Self {
        Self { buffer, stride: 1 }
    }

    pub fn is_interleaved(&self) -> bool {
        self.stride != 1
    }
}

/// Draw group in index units. Groups partition the mesh into per-material draw calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometryGroup {
    pub start: usize,
    pub count: usize,
    pub material_index: usize,
}

/// Range of indices (or vertices for non-indexed meshes) that participate in drawing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRange {
    pub start: usize,
    pub count: usize,
}

impl DrawRange {
    /// Unbounded range starting at zero.
    pub const ALL: Self = Self {
        start: 0,
        count: usize::MAX,
    };

    pub fn new(start: usize, count: usize) -> Self {
        Self { start, count }
    }

    /// Exclusive end of the range, saturating for unbounded ranges.
    #[inline]
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.count)
    }
}

impl Default for DrawRange {
    fn default() -> Self {
        Self::ALL
    }
}

/// The mesh description a BVH is built over.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshGeometry {
    pub positions: Option<PositionAttribute>,
    pub index: Option<IndexAttribute>,
    pub groups: Vec<GeometryGroup>,
    pub draw_range: DrawRange,
}

impl MeshGeometry {
    /// Non-indexed geometry where every three consecutive vertices form a triangle.
    pub fn new(positions: Vec<f32>) -> Self {
        Self {
            positions: Some(PositionAttribute::new(positions)),
            ..Default::default()
        }
    }

    /// Indexed geometry. The index width follows the vertex count.
    pub fn indexed(positions: Vec<f32>, indices: Vec<u32>) -> Self {
        let positions = PositionAttribute::new(positions);
        let buffer = IndexBuffer::for_vertex_count(indices, positions.count());
        Self {
            positions: Some(positions),
            index: Some(IndexAttribute::new(buffer)),
            ..Default::default()
        }
    }

    pub fn add_group(&mut self, start: usize, count: usize, material_index: usize) {
        self.groups.push(GeometryGroup {
            start,
            count,
            material_index,
        });
    }

    pub fn set_draw_range(&mut self, start: usize, count: usize) {
        self.draw_range = DrawRange::new(start, count);
    }

    /// Checks that the geometry can be used for a build.
    pub fn validate(&self) -> Result<(), BvhError> {
        match &self.positions {
            Some(positions) if positions.stride >= 3 => {}
            _ => return Err(BvhError::MissingPositions),
        }
        if self.index.as_ref().is_some_and(IndexAttribute::is_interleaved) {
            return Err(BvhError::InterleavedIndex);
        }
        Ok(())
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.as_ref().map_or(0, PositionAttribute::count)
    }

    /// Number of whole triangles in the index buffer, or in the vertex list when non-indexed.
    pub fn triangle_count(&self) -> usize {
        match &self.index {
            Some(index) => index.buffer.len() / 3,
            None => self.vertex_count() / 3,
        }
    }

    #[inline(always)]
    pub fn position(&self, index: usize) -> Vec3 {
        self.positions
            .as_ref()
            .map_or(Vec3::ZERO, |positions| positions.get(index))
    }

    #[inline(always)]
    pub fn set_position(&mut self, index: usize, value: Vec3) {
        if let Some(positions) = &mut self.positions {
            positions.set(index, value);
        }
    }

    /// Vertex index stored at slot `i` of the index buffer, or `i` itself when non-indexed.
    #[inline(always)]
    pub fn vertex_index(&self, i: usize) -> u32 {
        match &self.index {
            Some(index) => index.buffer.get(i),
            None => i as u32,
        }
    }

    /// Vertex indices of triangle `triangle` in the current index order.
    #[inline(always)]
    pub fn triangle_vertex_indices(&self, triangle: usize) -> [u32; 3] {
        let i = triangle * 3;
        [
            self.vertex_index(i),
            self.vertex_index(i + 1),
            self.vertex_index(i + 2),
        ]
    }

    #[inline(always)]
    pub fn triangle(&self, triangle: usize) -> Triangle {
        let [a, b, c] = self.triangle_vertex_indices(triangle);
        Triangle::new(
            self.position(a as usize),
            self.position(b as usize),
            self.position(c as usize),
        )
    }

    /// Generates an identity index for non-indexed geometry and returns the index buffer.
    pub fn ensure_index(&mut self) -> &mut IndexBuffer {
        let vertex_count = self.vertex_count();
        &mut self
            .index
            .get_or_insert_with(|| IndexAttribute::new(IndexBuffer::identity(vertex_count)))
            .buffer
    }

    /// Bounds of every vertex.
    pub fn bounding_box(&self) -> BoundingBox {
        let mut bounds = BoundingBox::EMPTY;
        for i in 0..self.vertex_count() {
            bounds.expand_by_point(self.position(i));
        }
        bounds
    }
}
