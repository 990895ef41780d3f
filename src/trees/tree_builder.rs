use std::collections::BTreeSet;

use super::build_options::BuildOptions;
use super::constants::MAX_LEAF_COUNT;
use super::tree_bounds::TriangleBounds;
use super::tree_encoder::encode_tree;
use super::tree_split::{optimal_split, Split};
use crate::error::BvhError;
use crate::geometry::{DrawRange, IndexBuffer, MeshGeometry};
use crate::utilities::BoundingBox;

/// Construction-time tree. Dropped once encoded.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum BuildNode {
    Leaf {
        bounds: BoundingBox,
        offset: usize,
        count: usize,
    },
    Internal {
        bounds: BoundingBox,
        split_axis: usize,
        left: Box<BuildNode>,
        right: Box<BuildNode>,
    },
}

impl BuildNode {
    pub fn bounds(&self) -> &BoundingBox {
        match self {
            BuildNode::Leaf { bounds, .. } | BuildNode::Internal { bounds, .. } => bounds,
        }
    }

    pub fn node_count(&self) -> usize {
        match self {
            BuildNode::Leaf { .. } => 1,
            BuildNode::Internal { left, right, .. } => 1 + left.node_count() + right.node_count(),
        }
    }
}

/// Contiguous triangle range `offset..offset + count` covered by one root.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RootRange {
    pub offset: usize,
    pub count: usize,
}

/// The storage partition swaps reorder.
enum TriangleOrder<'a> {
    /// Vertex index triples of the geometry itself.
    Direct(&'a mut IndexBuffer),
    /// Permutation slots, leaving the geometry untouched.
    Indirect(&'a mut [u32]),
}

impl TriangleOrder<'_> {
    #[inline(always)]
    fn swap(&mut self, a: usize, b: usize) {
        match self {
            TriangleOrder::Direct(index) => {
                for i in 0..3 {
                    index.swap(a * 3 + i, b * 3 + i);
                }
            }
            TriangleOrder::Indirect(slots) => slots.swap(a, b),
        }
    }
}

struct TreeBuilder<'a, 'p> {
    triangle_bounds: &'a mut TriangleBounds,
    order: TriangleOrder<'a>,
    options: &'a BuildOptions,
    total_triangles: usize,
    on_progress: Option<&'p mut dyn FnMut(f32)>,
    reached_max_depth: bool,
}

impl TreeBuilder<'_, '_> {
    fn trigger_progress(&mut self, triangles_processed: usize) {
        if let Some(on_progress) = self.on_progress.as_mut() {
            if self.total_triangles > 0 {
                on_progress(triangles_processed as f32 / self.total_triangles as f32);
            }
        }
    }

    fn leaf(&mut self, bounds: BoundingBox, offset: usize, count: usize) -> BuildNode {
        self.trigger_progress(offset + count);
        BuildNode::Leaf {
            bounds,
            offset,
            count,
        }
    }

    /// Hoare partition of `offset..offset + count` around the split plane.
    ///
    /// Triangles with a center below the plane end up before the returned index; triangles on or
    /// above it end up at or after it.
    fn partition(&mut self, offset: usize, count: usize, split: Split) -> usize {
        let Split { axis, position } = split;
        let mut left = offset as isize;
        let mut right = (offset + count) as isize - 1;
        loop {
            while left <= right && self.triangle_bounds.center(left as usize, axis) < position {
                left += 1;
            }
            while left <= right && self.triangle_bounds.center(right as usize, axis) >= position {
                right -= 1;
            }
            if left < right {
                self.order.swap(left as usize, right as usize);
                self.triangle_bounds.swap(left as usize, right as usize);
                left += 1;
                right -= 1;
            } else {
                return left as usize;
            }
        }
    }

    fn split_node(
        &mut self,
        bounds: BoundingBox,
        centroid_bounds: BoundingBox,
        offset: usize,
        count: usize,
        depth: usize,
    ) -> BuildNode {
        let max_depth = self.options.max_depth;
        if !self.reached_max_depth && depth >= max_depth {
            self.reached_max_depth = true;
            if self.options.verbose {
                tracing::warn!(
                    max_depth,
                    "max depth reached when generating BVH; consider increasing max_depth"
                );
            }
        }

        // A leaf record holds at most MAX_LEAF_COUNT triangles, so larger ranges are always split.
        let oversized = count > MAX_LEAF_COUNT;
        let fits_leaf = count <= self.options.max_leaf_tris.min(MAX_LEAF_COUNT);
        if fits_leaf || (depth >= max_depth && !oversized) {
            return self.leaf(bounds, offset, count);
        }
        if depth >= max_depth {
            return self.median_split(bounds, offset, count, depth);
        }

        let split = match optimal_split(
            self.triangle_bounds,
            &bounds,
            &centroid_bounds,
            offset,
            count,
            self.options.strategy,
        ) {
            Some(split) => split,
            None if oversized => return self.median_split(bounds, offset, count, depth),
            None => return self.leaf(bounds, offset, count),
        };

        let split_offset = self.partition(offset, count, split);
        if split_offset == offset || split_offset == offset + count {
            return if oversized {
                self.median_split(bounds, offset, count, depth)
            } else {
                self.leaf(bounds, offset, count)
            };
        }

        self.internal(bounds, split.axis, offset, split_offset - offset, count, depth)
    }

    /// Halves `offset..offset + count` by triangle count, keeping the current order.
    fn median_split(
        &mut self,
        bounds: BoundingBox,
        offset: usize,
        count: usize,
        depth: usize,
    ) -> BuildNode {
        let split_axis = bounds.longest_axis();
        self.internal(bounds, split_axis, offset, count / 2, count, depth)
    }

    fn internal(
        &mut self,
        bounds: BoundingBox,
        split_axis: usize,
        offset: usize,
        left_count: usize,
        count: usize,
        depth: usize,
    ) -> BuildNode {
        let (left_bounds, left_centroids) = self.triangle_bounds.range_bounds(offset, left_count);
        let left = self.split_node(left_bounds, left_centroids, offset, left_count, depth + 1);

        let split_offset = offset + left_count;
        let right_count = count - left_count;
        let (right_bounds, right_centroids) =
            self.triangle_bounds.range_bounds(split_offset, right_count);
        let right = self.split_node(
            right_bounds,
            right_centroids,
            split_offset,
            right_count,
            depth + 1,
        );

        BuildNode::Internal {
            bounds,
            split_axis,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn build(&mut self, range: RootRange) -> BuildNode {
        let (bounds, centroid_bounds) = self
            .triangle_bounds
            .range_bounds(range.offset, range.count);
        self.split_node(bounds, centroid_bounds, range.offset, range.count, 0)
    }
}

/// Single range over the draw range, clipped to the geometry's triangles.
pub(crate) fn full_geometry_range(geometry: &MeshGeometry, range: Option<DrawRange>) -> RootRange {
    let triangle_count = geometry.triangle_count();
    let draw_range = range.unwrap_or(geometry.draw_range);
    let offset = (draw_range.start / 3).min(triangle_count);
    let end = (draw_range.end() / 3).min(triangle_count);
    RootRange {
        offset,
        count: end.saturating_sub(offset),
    }
}

/// Ranges that keep triangles of different groups apart.
///
/// Every group start and end, clipped to the draw range, becomes a boundary; consecutive
/// boundaries form one range each.
pub(crate) fn root_index_ranges(geometry: &MeshGeometry, range: Option<DrawRange>) -> Vec<RootRange> {
    if geometry.groups.is_empty() {
        return vec![full_geometry_range(geometry, range)];
    }

    let triangle_count = geometry.triangle_count();
    let draw_range = range.unwrap_or(geometry.draw_range);
    let draw_start = draw_range.start / 3;
    let draw_end = draw_range.end() / 3;

    let mut boundaries = BTreeSet::new();
    for group in &geometry.groups {
        let start = draw_start.max(group.start / 3).min(triangle_count);
        let end = draw_end
            .min(group.start.saturating_add(group.count) / 3)
            .min(triangle_count);
        // Groups entirely outside the draw range add no boundaries.
        if end > start {
            boundaries.insert(start);
            boundaries.insert(end);
        }
    }

    let boundaries: Vec<usize> = boundaries.into_iter().collect();
    boundaries
        .windows(2)
        .map(|pair| RootRange {
            offset: pair[0],
            count: pair[1] - pair[0],
        })
        .collect()
}

/// True if the root ranges do not cover every triangle of the geometry.
pub(crate) fn has_group_gaps(geometry: &MeshGeometry, range: Option<DrawRange>) -> bool {
    let covered: usize = root_index_ranges(geometry, range)
        .iter()
        .map(|r| r.count)
        .sum();
    covered != geometry.triangle_count()
}

/// Output of a build: one packed buffer per root plus the optional permutation.
pub(crate) struct BuiltRoots {
    pub roots: Vec<Vec<u32>>,
    pub indirect_buffer: Option<Vec<u32>>,
}

/// Builds and encodes every root of the geometry.
///
/// In direct mode the geometry's index is reordered in place (and generated first if missing).
pub(crate) fn build_packed_roots(
    geometry: &mut MeshGeometry,
    options: &BuildOptions,
    on_progress: Option<&mut dyn FnMut(f32)>,
) -> Result<BuiltRoots, BvhError> {
    geometry.validate()?;
    let _span = tracing::debug_span!(
        "build_bvh",
        strategy = ?options.strategy,
        indirect = options.indirect
    )
    .entered();

    let total_triangles = geometry.triangle_count();
    let mut indirect_buffer = None;
    let ranges = if options.indirect {
        if options.verbose && has_group_gaps(geometry, options.range) {
            tracing::warn!(
                "geometry groups or draw range do not span every triangle while using the indirect option; queries may report triangles that are not drawn"
            );
        }
        indirect_buffer = Some((0..total_triangles as u32).collect::<Vec<u32>>());
        vec![full_geometry_range(geometry, options.range)]
    } else {
        root_index_ranges(geometry, options.range)
    };

    let mut triangle_bounds = TriangleBounds::compute(geometry);
    let order = match indirect_buffer.as_mut() {
        Some(slots) => TriangleOrder::Indirect(slots.as_mut_slice()),
        None => TriangleOrder::Direct(geometry.ensure_index()),
    };

    let mut builder = TreeBuilder {
        triangle_bounds: &mut triangle_bounds,
        order,
        options,
        total_triangles,
        on_progress,
        reached_max_depth: false,
    };

    let mut roots = Vec::with_capacity(ranges.len());
    for range in ranges {
        let tree = builder.build(range);
        roots.push(encode_tree(&tree)?);
    }

    tracing::debug!(
        roots = roots.len(),
        nodes = roots.iter().map(|r| r.len() / 8).sum::<usize>(),
        "built BVH"
    );

    Ok(BuiltRoots {
        roots,
        indirect_buffer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trees::build_options::SplitStrategy;
    use crate::trees::test_utils::random_triangle_soup;

    fn build_tree(geometry: &mut MeshGeometry, options: &BuildOptions) -> (BuildNode, TriangleBounds) {
        let mut triangle_bounds = TriangleBounds::compute(geometry);
        let total_triangles = geometry.triangle_count();
        let range = full_geometry_range(geometry, None);
        let mut builder = TreeBuilder {
            triangle_bounds: &mut triangle_bounds,
            order: TriangleOrder::Direct(geometry.ensure_index()),
            options,
            total_triangles,
            on_progress: None,
            reached_max_depth: false,
        };
        let tree = builder.build(range);
        (tree, triangle_bounds)
    }

    fn collect_leaves(node: &BuildNode, leaves: &mut Vec<(usize, usize)>) {
        match node {
            BuildNode::Leaf { offset, count, .. } => leaves.push((*offset, *count)),
            BuildNode::Internal { left, right, .. } => {
                collect_leaves(left, leaves);
                collect_leaves(right, leaves);
            }
        }
    }

    #[test]
    fn partition_orders_centers_around_plane() {
        let mut geometry = random_triangle_soup(200, 7);
        let mut triangle_bounds = TriangleBounds::compute(&geometry);
        let options = BuildOptions::default();
        let count = triangle_bounds.len();
        let split = Split {
            axis: 1,
            position: 0.25,
        };
        let mut builder = TreeBuilder {
            triangle_bounds: &mut triangle_bounds,
            order: TriangleOrder::Direct(geometry.ensure_index()),
            options: &options,
            total_triangles: count,
            on_progress: None,
            reached_max_depth: false,
        };
        let split_offset = builder.partition(0, count, split);
        for triangle in 0..count {
            let center = triangle_bounds.center(triangle, 1);
            if triangle < split_offset {
                assert!(center < 0.25);
            } else {
                assert!(center >= 0.25);
            }
        }
        // Bounds records moved together with the index triples.
        let recomputed = TriangleBounds::compute(&geometry);
        for triangle in 0..count {
            assert_eq!(recomputed.centroid(triangle), triangle_bounds.centroid(triangle));
        }
    }

    #[test]
    fn leaves_partition_the_range() {
        for strategy in [SplitStrategy::Center, SplitStrategy::Average, SplitStrategy::Sah] {
            let mut geometry = random_triangle_soup(300, 3);
            let options = BuildOptions {
                strategy,
                max_leaf_tris: 5,
                ..Default::default()
            };
            let (tree, _) = build_tree(&mut geometry, &options);
            let mut leaves = Vec::new();
            collect_leaves(&tree, &mut leaves);
            let mut next = 0;
            for (offset, count) in leaves {
                assert_eq!(offset, next);
                assert!(count > 0);
                next += count;
            }
            assert_eq!(next, 300);
        }
    }

    #[test]
    fn max_depth_forces_leaves() {
        let mut geometry = random_triangle_soup(64, 11);
        let options = BuildOptions {
            max_depth: 0,
            verbose: false,
            ..Default::default()
        };
        let (tree, _) = build_tree(&mut geometry, &options);
        assert!(matches!(tree, BuildNode::Leaf { count: 64, .. }));
    }

    #[test]
    fn coincident_triangles_split_below_leaf_limit() {
        let count = 70_000;
        let triangle = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let positions: Vec<f32> = triangle.iter().copied().cycle().take(count * 9).collect();
        for max_depth in [0, BuildOptions::default().max_depth] {
            let mut geometry = MeshGeometry::new(positions.clone());
            let options = BuildOptions {
                max_depth,
                verbose: false,
                ..Default::default()
            };
            let (tree, _) = build_tree(&mut geometry, &options);
            let mut leaves = Vec::new();
            collect_leaves(&tree, &mut leaves);
            assert!(leaves.len() > 1);
            assert!(leaves.iter().all(|&(_, c)| c <= MAX_LEAF_COUNT));
            assert_eq!(leaves.iter().map(|&(_, c)| c).sum::<usize>(), count);

            let roots = build_packed_roots(&mut geometry, &options, None).unwrap();
            assert_eq!(roots.roots.len(), 1);
        }
    }

    #[test]
    fn groups_become_root_ranges() {
        let mut geometry = random_triangle_soup(10, 1);
        geometry.add_group(0, 12, 0);
        geometry.add_group(6, 15, 1);
        geometry.add_group(21, 9, 2);
        let ranges = root_index_ranges(&geometry, None);
        assert_eq!(
            ranges,
            vec![
                RootRange { offset: 0, count: 2 },
                RootRange { offset: 2, count: 2 },
                RootRange { offset: 4, count: 3 },
                RootRange { offset: 7, count: 3 },
            ]
        );
        assert!(!has_group_gaps(&geometry, None));

        geometry.set_draw_range(3, 15);
        let ranges = root_index_ranges(&geometry, None);
        assert_eq!(ranges.first().map(|r| r.offset), Some(1));
        assert_eq!(ranges.iter().map(|r| r.count).sum::<usize>(), 5);
        assert!(has_group_gaps(&geometry, None));
    }

    #[test]
    fn progress_reaches_one() {
        let mut geometry = random_triangle_soup(50, 5);
        let mut reports = Vec::new();
        let mut on_progress = |fraction: f32| reports.push(fraction);
        build_packed_roots(&mut geometry, &BuildOptions::default(), Some(&mut on_progress))
            .unwrap();
        assert!(!reports.is_empty());
        assert!(reports.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(reports.last().copied(), Some(1.0));
    }
}
