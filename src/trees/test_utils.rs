//! Fixtures and brute-force oracles shared by the tree tests.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geometry::{MeshGeometry, Ray, Side};

// =============================================================================
// Fixture meshes
// =============================================================================

/// Axis-aligned cube spanning `-0.5..0.5` with outward facing triangles.
pub fn unit_cube() -> MeshGeometry {
    let mut positions = Vec::with_capacity(24);
    for corner in 0..8 {
        positions.push(if corner & 1 != 0 { 0.5 } else { -0.5 });
        positions.push(if corner & 2 != 0 { 0.5 } else { -0.5 });
        positions.push(if corner & 4 != 0 { 0.5 } else { -0.5 });
    }
    let indices = vec![
        0, 2, 1, 1, 2, 3, // -z
        4, 5, 6, 5, 7, 6, // +z
        0, 4, 2, 2, 4, 6, // -x
        1, 3, 5, 3, 7, 5, // +x
        0, 1, 4, 1, 5, 4, // -y
        2, 6, 3, 3, 6, 7, // +y
    ];
    MeshGeometry::indexed(positions, indices)
}

fn random_triangle(rng: &mut StdRng) -> [f32; 9] {
    let center = Vec3::new(
        rng.random_range(-1.0..1.0),
        rng.random_range(-1.0..1.0),
        rng.random_range(-1.0..1.0),
    );
    let mut vertices = [0.0; 9];
    for vertex in vertices.chunks_exact_mut(3) {
        vertex[0] = center.x + rng.random_range(-0.1..0.1);
        vertex[1] = center.y + rng.random_range(-0.1..0.1);
        vertex[2] = center.z + rng.random_range(-0.1..0.1);
    }
    vertices
}

/// Non-indexed soup of small random triangles inside `-1.1..1.1`.
pub fn random_triangle_soup(count: usize, seed: u64) -> MeshGeometry {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut positions = Vec::with_capacity(count * 9);
    for _ in 0..count {
        positions.extend_from_slice(&random_triangle(&mut rng));
    }
    MeshGeometry::new(positions)
}

/// Indexed soup where the index references vertices in reverse order.
pub fn random_indexed_soup(count: usize, seed: u64) -> MeshGeometry {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut positions = Vec::with_capacity(count * 9);
    for _ in 0..count {
        positions.extend_from_slice(&random_triangle(&mut rng));
    }
    let vertex_count = count as u32 * 3;
    let mut indices = Vec::with_capacity(count * 3);
    for triangle in 0..count as u32 {
        let base = vertex_count - 3 * (triangle + 1);
        indices.extend_from_slice(&[base, base + 1, base + 2]);
    }
    MeshGeometry::indexed(positions, indices)
}

/// Random ray starting outside the soup and aimed at a point inside it.
pub fn random_ray(rng: &mut StdRng) -> Ray {
    let origin = Vec3::new(
        rng.random_range(-3.0..3.0),
        rng.random_range(-3.0..3.0),
        rng.random_range(2.0..3.0),
    );
    let target = Vec3::new(
        rng.random_range(-1.0..1.0),
        rng.random_range(-1.0..1.0),
        rng.random_range(-1.0..1.0),
    );
    Ray::new(origin, (target - origin).normalize())
}

// =============================================================================
// Brute-force oracles
// =============================================================================

/// Nearest hit distance over every triangle of the geometry.
pub fn brute_force_first_hit(geometry: &MeshGeometry, ray: &Ray, side: Side) -> Option<f32> {
    (0..geometry.triangle_count())
        .filter_map(|i| {
            geometry
                .triangle(i)
                .ray_test(ray, side)
                .map(|t| ray.at(t).distance(ray.origin))
        })
        .min_by(f32::total_cmp)
}

/// Distance from `point` to the nearest triangle of the geometry.
pub fn brute_force_closest_distance(geometry: &MeshGeometry, point: Vec3) -> f32 {
    (0..geometry.triangle_count())
        .map(|i| geometry.triangle(i).distance_to_point(point))
        .fold(f32::INFINITY, f32::min)
}
