use glam::Vec3;

use super::mesh_bvh::MeshBvh;
use super::node::{self, Node};
use crate::geometry::{Ray, Side, TreeRay};

/// Maximum stack depth reserved up front for iterative traversals.
pub const TRAVERSAL_STACK_CAPACITY: usize = 64;

/// A ray hit against one triangle of the mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    /// Distance from the ray origin to `point`.
    pub distance: f32,
    /// Triangle index in the geometry.
    pub triangle_index: usize,
    pub vertex_indices: [u32; 3],
    /// Unit face normal following the triangle winding.
    pub normal: Vec3,
}

impl MeshBvh {
    /// Tests the ray against the triangle at range position `i`.
    #[inline]
    fn intersect_triangle(&self, ray: &Ray, side: Side, i: usize, near: f32, far: f32) -> Option<RayHit> {
        let triangle_index = self.resolve_triangle_index(i);
        let vertex_indices = self.geometry.triangle_vertex_indices(triangle_index);
        let triangle = self.geometry.triangle(triangle_index);
        let t = triangle.ray_test(ray, side)?;
        let point = ray.at(t);
        let distance = ray.origin.distance(point);
        if distance < near || distance > far {
            return None;
        }
        Some(RayHit {
            point,
            distance,
            triangle_index,
            vertex_indices,
            normal: triangle.normal(),
        })
    }

    fn closest_triangle_in_range(
        &self,
        ray: &Ray,
        side: Side,
        offset: usize,
        count: usize,
        near: f32,
        far: f32,
    ) -> Option<RayHit> {
        let mut closest: Option<RayHit> = None;
        for i in offset..offset + count {
            if let Some(hit) = self.intersect_triangle(ray, side, i, near, far) {
                if closest.map_or(true, |c| hit.distance < c.distance) {
                    closest = Some(hit);
                }
            }
        }
        closest
    }

    fn ray_cast_root(
        &self,
        root: &[u32],
        ray: &Ray,
        tree_ray: &TreeRay,
        side: Side,
        near: f32,
        far: f32,
        hits: &mut Vec<RayHit>,
    ) {
        let mut stack = Vec::with_capacity(TRAVERSAL_STACK_CAPACITY);
        stack.push(0usize);
        while let Some(n32) = stack.pop() {
            match Node::decode(root, n32) {
                Node::Leaf { offset, count } => {
                    for i in offset as usize..(offset + count) as usize {
                        if let Some(hit) = self.intersect_triangle(ray, side, i, near, far) {
                            hits.push(hit);
                        }
                    }
                }
                Node::Internal { right, .. } => {
                    // Right is pushed first so the left subtree is visited first.
                    let right_bounds = node::node_bounds(root, right);
                    if tree_ray.intersect(right_bounds.min, right_bounds.max).is_some() {
                        stack.push(right);
                    }
                    let left = node::left_child(n32);
                    let left_bounds = node::node_bounds(root, left);
                    if tree_ray.intersect(left_bounds.min, left_bounds.max).is_some() {
                        stack.push(left);
                    }
                }
            }
        }
    }

    fn ray_cast_first_node(
        &self,
        root: &[u32],
        n32: usize,
        ray: &Ray,
        tree_ray: &TreeRay,
        side: Side,
        near: f32,
        far: f32,
    ) -> Option<RayHit> {
        let (split_axis, right) = match Node::decode(root, n32) {
            Node::Leaf { offset, count } => {
                return self.closest_triangle_in_range(
                    ray,
                    side,
                    offset as usize,
                    count as usize,
                    near,
                    far,
                );
            }
            Node::Internal { split_axis, right } => (split_axis, right),
        };

        // Visit the child the ray reaches first along the split axis.
        let left_to_right = ray.direction[split_axis] >= 0.0;
        let left = node::left_child(n32);
        let (c1, c2) = if left_to_right { (left, right) } else { (right, left) };

        let c1_bounds = node::node_bounds(root, c1);
        let c1_result = match tree_ray.intersect(c1_bounds.min, c1_bounds.max) {
            Some(_) => self.ray_cast_first_node(root, c1, ray, tree_ray, side, near, far),
            None => None,
        };

        let c2_bounds = node::node_bounds(root, c2);
        if let Some(hit) = c1_result {
            // A hit that lies before the far child's slab cannot be beaten by it.
            let coordinate = hit.point[split_axis];
            let is_outside = if left_to_right {
                coordinate <= c2_bounds.min[split_axis]
            } else {
                coordinate >= c2_bounds.max[split_axis]
            };
            if is_outside {
                return Some(hit);
            }
        }

        let c2_result = match tree_ray.intersect(c2_bounds.min, c2_bounds.max) {
            Some(_) => self.ray_cast_first_node(root, c2, ray, tree_ray, side, near, far),
            None => None,
        };

        match (c1_result, c2_result) {
            (Some(a), Some(b)) => Some(if a.distance <= b.distance { a } else { b }),
            (a, b) => a.or(b),
        }
    }

    /// Every triangle hit by the ray with a distance in `near..=far`, root by root.
    pub fn raycast(&self, ray: &Ray, side: Side, near: f32, far: f32) -> Vec<RayHit> {
        let tree_ray = TreeRay::new(ray, Self::far_parameter(ray, far));
        let mut hits = Vec::new();
        for root in &self.roots {
            self.ray_cast_root(root, ray, &tree_ray, side, near, far, &mut hits);
        }
        hits
    }

    /// The closest triangle hit by the ray with a distance in `near..=far`.
    pub fn raycast_first(&self, ray: &Ray, side: Side, near: f32, far: f32) -> Option<RayHit> {
        let tree_ray = TreeRay::new(ray, Self::far_parameter(ray, far));
        let mut closest: Option<RayHit> = None;
        for root in &self.roots {
            if let Some(hit) = self.ray_cast_first_node(root, 0, ray, &tree_ray, side, near, far) {
                if closest.map_or(true, |c| hit.distance < c.distance) {
                    closest = Some(hit);
                }
            }
        }
        closest
    }

    /// Converts a distance limit into ray parameter units.
    #[inline]
    fn far_parameter(ray: &Ray, far: f32) -> f32 {
        let length = ray.direction.length();
        if length > 0.0 {
            far / length
        } else {
            f32::INFINITY
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trees::build_options::{BuildOptions, SplitStrategy};
    use crate::trees::test_utils::{brute_force_first_hit, random_ray, random_triangle_soup, unit_cube};
    use crate::geometry::MeshGeometry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cube_bvh() -> MeshBvh {
        let options = BuildOptions {
            strategy: SplitStrategy::Sah,
            max_leaf_tris: 4,
            ..Default::default()
        };
        MeshBvh::new(unit_cube(), &options).unwrap()
    }

    #[test]
    fn cube_ray_enters_and_exits() {
        let bvh = cube_bvh();
        let ray = Ray::new(Vec3::new(0.1, 0.2, -2.0), Vec3::Z);
        let mut hits = bvh.raycast(&ray, Side::Double, 0.0, f32::INFINITY);
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        assert_eq!(hits.len(), 2);
        assert!((hits[0].distance - 1.5).abs() < 1e-5);
        assert!((hits[1].distance - 2.5).abs() < 1e-5);
        assert!((hits[0].normal - Vec3::NEG_Z).length() < 1e-5);

        // Front faces only: the exit face points away from the ray.
        let front = bvh.raycast(&ray, Side::Front, 0.0, f32::INFINITY);
        assert_eq!(front.len(), 1);
        let back = bvh.raycast(&ray, Side::Back, 0.0, f32::INFINITY);
        assert_eq!(back.len(), 1);
        assert!((back[0].distance - 2.5).abs() < 1e-5);
    }

    #[test]
    fn cube_first_hit_from_center_is_half_depth() {
        let bvh = cube_bvh();
        let ray = Ray::new(Vec3::new(0.1, 0.2, 0.0), Vec3::Z);
        let hit = bvh.raycast_first(&ray, Side::Double, 0.0, f32::INFINITY).unwrap();
        assert!((hit.distance - 0.5).abs() < 1e-5);
        assert!((hit.point.z - 0.5).abs() < 1e-5);
    }

    #[test]
    fn near_and_far_limit_hits() {
        let bvh = cube_bvh();
        let ray = Ray::new(Vec3::new(0.1, 0.2, -2.0), Vec3::Z);
        assert_eq!(bvh.raycast(&ray, Side::Double, 0.0, 2.0).len(), 1);
        assert_eq!(bvh.raycast(&ray, Side::Double, 2.0, 10.0).len(), 1);
        let first = bvh.raycast_first(&ray, Side::Double, 2.0, 10.0).unwrap();
        assert!((first.distance - 2.5).abs() < 1e-5);
        assert!(bvh.raycast_first(&ray, Side::Double, 0.0, 1.0).is_none());
    }

    #[test]
    fn first_hit_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(17);
        for strategy in [SplitStrategy::Center, SplitStrategy::Average, SplitStrategy::Sah] {
            for indirect in [false, true] {
                let geometry = random_triangle_soup(500, 23);
                let options = BuildOptions {
                    strategy,
                    indirect,
                    ..Default::default()
                };
                let bvh = MeshBvh::new(geometry, &options).unwrap();
                for _ in 0..100 {
                    let ray = random_ray(&mut rng);
                    let expected = brute_force_first_hit(bvh.geometry(), &ray, Side::Double);
                    let actual = bvh
                        .raycast_first(&ray, Side::Double, 0.0, f32::INFINITY)
                        .map(|hit| hit.distance);
                    match (expected, actual) {
                        (Some(e), Some(a)) => assert!((e - a).abs() < 1e-4, "{e} != {a}"),
                        (None, None) => {}
                        other => panic!("mismatch {other:?}"),
                    }
                    let all = bvh.raycast(&ray, Side::Double, 0.0, f32::INFINITY);
                    let min = all.iter().map(|h| h.distance).min_by(f32::total_cmp);
                    assert_eq!(min.is_some(), expected.is_some());
                }
            }
        }
    }

    #[test]
    fn single_triangle_matches_direct_test() {
        let geometry = MeshGeometry::new(vec![-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, 0.0]);
        let triangle = geometry.triangle(0);
        let bvh = MeshBvh::new(geometry, &BuildOptions::default()).unwrap();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 3.0), Vec3::NEG_Z);
        let expected = triangle.ray_test(&ray, Side::Front).unwrap();
        let hit = bvh.raycast_first(&ray, Side::Front, 0.0, f32::INFINITY).unwrap();
        assert_eq!(hit.distance, expected);
        assert_eq!(hit.triangle_index, 0);
        assert_eq!(hit.vertex_indices, [0, 1, 2]);
    }
}
