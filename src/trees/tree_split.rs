use super::build_options::SplitStrategy;
use super::constants::{BIN_COUNT, TRAVERSAL_COST, TRIANGLE_INTERSECT_COST};
use super::tree_bounds::TriangleBounds;
use crate::utilities::BoundingBox;

/// A split plane: triangles whose center on `axis` is below `position` go left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Split {
    pub axis: usize,
    pub position: f32,
}

/// Chooses where to split the triangles in `offset..offset + count`.
///
/// Returns `None` when the strategy finds nothing better than keeping the range as a leaf.
pub(crate) fn optimal_split(
    triangle_bounds: &TriangleBounds,
    node_bounds: &BoundingBox,
    centroid_bounds: &BoundingBox,
    offset: usize,
    count: usize,
    strategy: SplitStrategy,
) -> Option<Split> {
    match strategy {
        SplitStrategy::Center => {
            let axis = centroid_bounds.longest_axis();
            Some(Split {
                axis,
                position: (centroid_bounds.min[axis] + centroid_bounds.max[axis]) / 2.0,
            })
        }
        SplitStrategy::Average => {
            let axis = node_bounds.longest_axis();
            Some(Split {
                axis,
                position: average_center(triangle_bounds, offset, count, axis),
            })
        }
        SplitStrategy::Sah => sah_split(triangle_bounds, node_bounds, centroid_bounds, offset, count),
    }
}

fn average_center(triangle_bounds: &TriangleBounds, offset: usize, count: usize, axis: usize) -> f32 {
    let mut sum = 0.0;
    for triangle in offset..offset + count {
        sum += triangle_bounds.center(triangle, axis);
    }
    sum / count as f32
}

#[inline(always)]
fn split_cost(
    root_area: f32,
    left: &BoundingBox,
    left_count: usize,
    right: &BoundingBox,
    right_count: usize,
) -> f32 {
    let left_probability = if left_count != 0 {
        left.surface_area() / root_area
    } else {
        0.0
    };
    let right_probability = if right_count != 0 {
        right.surface_area() / root_area
    } else {
        0.0
    };
    TRAVERSAL_COST
        + TRIANGLE_INTERSECT_COST
            * (left_probability * left_count as f32 + right_probability * right_count as f32)
}

#[derive(Clone, Copy)]
struct Bin {
    candidate: f32,
    count: usize,
    bounds: BoundingBox,
    left_bounds: BoundingBox,
    right_bounds: BoundingBox,
}

impl Default for Bin {
    fn default() -> Self {
        Self {
            candidate: 0.0,
            count: 0,
            bounds: BoundingBox::EMPTY,
            left_bounds: BoundingBox::EMPTY,
            right_bounds: BoundingBox::EMPTY,
        }
    }
}

fn sah_split(
    triangle_bounds: &TriangleBounds,
    node_bounds: &BoundingBox,
    centroid_bounds: &BoundingBox,
    offset: usize,
    count: usize,
) -> Option<Split> {
    let root_area = node_bounds.surface_area();
    let mut best_cost = TRIANGLE_INTERSECT_COST * count as f32;
    let mut best: Option<Split> = None;
    let end = offset + count;

    for axis in 0..3 {
        if count < BIN_COUNT / 4 {
            // Few triangles: every distinct center is a candidate plane.
            let mut candidates: Vec<Bin> = (offset..end)
                .map(|triangle| Bin {
                    candidate: triangle_bounds.center(triangle, axis),
                    ..Default::default()
                })
                .collect();
            candidates.sort_by(|a, b| a.candidate.total_cmp(&b.candidate));
            candidates.dedup_by(|a, b| a.candidate == b.candidate);

            for triangle in offset..end {
                let center = triangle_bounds.center(triangle, axis);
                for bin in candidates.iter_mut() {
                    if center >= bin.candidate {
                        triangle_bounds.expand(triangle, &mut bin.right_bounds);
                    } else {
                        triangle_bounds.expand(triangle, &mut bin.left_bounds);
                        bin.count += 1;
                    }
                }
            }

            for bin in &candidates {
                let left_count = bin.count;
                let right_count = count - left_count;
                let cost = split_cost(
                    root_area,
                    &bin.left_bounds,
                    left_count,
                    &bin.right_bounds,
                    right_count,
                );
                if cost < best_cost {
                    best_cost = cost;
                    best = Some(Split {
                        axis,
                        position: bin.candidate,
                    });
                }
            }
        } else {
            let axis_left = centroid_bounds.min[axis];
            let axis_length = centroid_bounds.max[axis] - axis_left;
            let bin_width = axis_length / BIN_COUNT as f32;

            let mut bins = [Bin::default(); BIN_COUNT];
            for (i, bin) in bins.iter_mut().enumerate() {
                bin.candidate = axis_left + bin_width + i as f32 * bin_width;
            }

            for triangle in offset..end {
                let relative_center = triangle_bounds.center(triangle, axis) - axis_left;
                // A zero-width axis yields NaN here, which casts to bin zero.
                let bin_index = ((relative_center / bin_width) as usize).min(BIN_COUNT - 1);
                let bin = &mut bins[bin_index];
                bin.count += 1;
                triangle_bounds.expand(triangle, &mut bin.bounds);
            }

            // Running unions from the right so each boundary reads its right side in O(1).
            bins[BIN_COUNT - 1].right_bounds = bins[BIN_COUNT - 1].bounds;
            for i in (0..BIN_COUNT - 1).rev() {
                bins[i].right_bounds = bins[i].bounds.union(&bins[i + 1].right_bounds);
            }

            let mut left_bounds = BoundingBox::EMPTY;
            let mut left_count = 0;
            for i in 0..BIN_COUNT - 1 {
                let bin = &bins[i];
                if bin.count != 0 {
                    left_bounds = left_bounds.union(&bin.bounds);
                }
                left_count += bin.count;

                let right_count = count - left_count;
                let cost = split_cost(
                    root_area,
                    &left_bounds,
                    left_count,
                    &bins[i + 1].right_bounds,
                    right_count,
                );
                if cost < best_cost {
                    best_cost = cost;
                    best = Some(Split {
                        axis,
                        position: bin.candidate,
                    });
                }
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::MeshGeometry;

    /// Two well separated clusters of small triangles along x.
    fn clusters(per_cluster: usize) -> MeshGeometry {
        let mut positions = Vec::new();
        for cluster in [0.0f32, 100.0] {
            for i in 0..per_cluster {
                let x = cluster + i as f32 * 0.1;
                positions.extend_from_slice(&[x, 0.0, 0.0, x + 0.05, 0.0, 0.0, x, 0.05, 0.0]);
            }
        }
        MeshGeometry::new(positions)
    }

    fn split_for(geometry: &MeshGeometry, strategy: SplitStrategy) -> Option<Split> {
        let bounds = TriangleBounds::compute(geometry);
        let count = bounds.len();
        let (node, centroids) = bounds.range_bounds(0, count);
        optimal_split(&bounds, &node, &centroids, 0, count, strategy)
    }

    #[test]
    fn center_splits_centroid_midpoint() {
        let split = split_for(&clusters(3), SplitStrategy::Center).unwrap();
        assert_eq!(split.axis, 0);
        assert!(split.position > 1.0 && split.position < 100.0);
    }

    #[test]
    fn average_splits_at_mean_center() {
        let split = split_for(&clusters(3), SplitStrategy::Average).unwrap();
        assert_eq!(split.axis, 0);
        assert!(split.position > 1.0 && split.position < 100.0);
    }

    #[test]
    fn sah_separates_clusters_in_both_paths() {
        // Below BIN_COUNT / 4 triangles every center is tried as a plane.
        let small = split_for(&clusters(2), SplitStrategy::Sah).unwrap();
        assert_eq!(small.axis, 0);
        assert!(small.position > 1.0 && small.position < 100.1);

        let binned = split_for(&clusters(20), SplitStrategy::Sah).unwrap();
        assert_eq!(binned.axis, 0);
        assert!(binned.position > 2.0 && binned.position < 100.1);
    }

    #[test]
    fn sah_keeps_coincident_triangles_together() {
        let mut positions = Vec::new();
        for _ in 0..4 {
            positions.extend_from_slice(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        }
        assert!(split_for(&MeshGeometry::new(positions), SplitStrategy::Sah).is_none());
    }
}
