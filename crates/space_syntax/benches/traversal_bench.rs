//! Criterion benchmarks for the traversal kernels.
//! Focus sizes: square rooms of side in {10, 20, 40} grid cells, a
//! single origin at the centre.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::Vector2;
use space_syntax::comm::NullCommunicator;
use space_syntax::geom::{PixelRef, Region};
use space_syntax::grid::{build_visibility, PointMap};
use space_syntax::traversal::angular::run_angular_from;
use space_syntax::traversal::metric::run_metric_from;
use space_syntax::traversal::visual::run_visual_from;
use space_syntax::traversal::Radius;

fn empty_room(n: usize) -> PointMap {
    let region = Region::new(Vector2::new(0.0, 0.0), Vector2::new(n as f64, n as f64));
    let mut map = PointMap::new(region, 1.0).unwrap();
    map.fill_region(&region);
    build_visibility(&mut map, &[], &NullCommunicator).unwrap();
    map
}

fn bench_traversal(c: &mut Criterion) {
    let mut group = c.benchmark_group("traversal");
    for &n in &[10usize, 20, 40] {
        let map = empty_room(n);
        let origin = PixelRef::new((n / 2) as i32, (n / 2) as i32);

        group.bench_with_input(BenchmarkId::new("visual_bfs", n), &n, |b, _| {
            b.iter(|| run_visual_from(&map, origin, Radius::Unbounded));
        });
        group.bench_with_input(BenchmarkId::new("metric_dijkstra", n), &n, |b, _| {
            b.iter(|| run_metric_from(&map, origin, Radius::Unbounded));
        });
        group.bench_with_input(BenchmarkId::new("angular_bucket", n), &n, |b, _| {
            b.iter(|| run_angular_from(&map, origin, 1024, Radius::Unbounded));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_traversal);
criterion_main!(benches);
