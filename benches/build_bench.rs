//! Build and query benchmarks over a procedural sphere mesh.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;
use mesh_bvh::geometry::{MeshGeometry, Ray, Side};
use mesh_bvh::{BuildOptions, MeshBvh, SplitStrategy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// =============================================================================
// Fixtures
// =============================================================================

/// UV sphere with `segments * rings * 2` triangles.
fn sphere(segments: u32, rings: u32) -> MeshGeometry {
    let mut positions = Vec::new();
    for ring in 0..=rings {
        let theta = ring as f32 / rings as f32 * std::f32::consts::PI;
        for segment in 0..=segments {
            let phi = segment as f32 / segments as f32 * std::f32::consts::TAU;
            positions.extend_from_slice(&[
                theta.sin() * phi.cos(),
                theta.cos(),
                theta.sin() * phi.sin(),
            ]);
        }
    }
    let mut indices = Vec::new();
    for ring in 0..rings {
        for segment in 0..segments {
            let a = ring * (segments + 1) + segment;
            let b = a + segments + 1;
            indices.extend_from_slice(&[a, b, a + 1, b, b + 1, a + 1]);
        }
    }
    MeshGeometry::indexed(positions, indices)
}

fn rays(count: usize) -> Vec<Ray> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..count)
        .map(|_| {
            let origin = Vec3::new(
                rng.random_range(-2.0..2.0),
                rng.random_range(-2.0..2.0),
                3.0,
            );
            let target = Vec3::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                0.0,
            );
            Ray::new(origin, (target - origin).normalize())
        })
        .collect()
}

const STRATEGIES: [(&str, SplitStrategy); 3] = [
    ("center", SplitStrategy::Center),
    ("average", SplitStrategy::Average),
    ("sah", SplitStrategy::Sah),
];

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    let geometry = sphere(128, 64);
    for (name, strategy) in STRATEGIES {
        let options = BuildOptions {
            strategy,
            verbose: false,
            ..BuildOptions::default()
        };
        group.bench_with_input(BenchmarkId::new("sphere_16k", name), &options, |b, options| {
            b.iter(|| MeshBvh::new(black_box(geometry.clone()), options))
        });
    }
    group.finish();
}

fn bench_raycast_first(c: &mut Criterion) {
    let mut group = c.benchmark_group("raycast_first");
    let rays = rays(1024);
    for (name, strategy) in STRATEGIES {
        let options = BuildOptions {
            strategy,
            verbose: false,
            ..BuildOptions::default()
        };
        let Ok(bvh) = MeshBvh::new(sphere(128, 64), &options) else {
            continue;
        };
        group.bench_function(BenchmarkId::new("sphere_16k", name), |b| {
            b.iter(|| {
                for ray in &rays {
                    black_box(bvh.raycast_first(ray, Side::Front, 0.0, f32::INFINITY));
                }
            })
        });
    }
    group.finish();
}

fn bench_closest_point(c: &mut Criterion) {
    let Ok(bvh) = MeshBvh::new(sphere(128, 64), &BuildOptions::default()) else {
        return;
    };
    c.bench_function("closest_point_to_point", |b| {
        b.iter(|| bvh.closest_point_to_point(black_box(Vec3::new(0.3, 1.4, -0.2)), 0.0, f32::INFINITY))
    });
}

criterion_group!(benches, bench_build, bench_raycast_first, bench_closest_point);
criterion_main!(benches);
