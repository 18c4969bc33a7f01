//! Criterion benchmarks for pixel rasterization.
//! Focus sizes: line spans in {10, 50, 200} grid cells.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::Vector2;
use space_syntax::geom::{PixelBase, Region};

fn base_for(n: usize) -> PixelBase {
    let region = Region::new(Vector2::new(0.0, 0.0), Vector2::new(n as f64, n as f64));
    PixelBase::new(region, n, n)
}

fn bench_rasterize(c: &mut Criterion) {
    let mut group = c.benchmark_group("rasterize");
    for &n in &[10usize, 50, 200] {
        let base = base_for(n);
        let a = Vector2::new(0.3, 0.3);
        let b = Vector2::new(n as f64 - 0.7, n as f64 - 1.1);

        group.bench_with_input(BenchmarkId::new("strict", n), &n, |bch, _| {
            bch.iter(|| base.rasterize_strict(a, b));
        });
        group.bench_with_input(BenchmarkId::new("touching", n), &n, |bch, _| {
            bch.iter(|| base.rasterize_touching(a, b, 1e-6));
        });
        group.bench_with_input(BenchmarkId::new("quick", n), &n, |bch, _| {
            let pa = base.pixelate(a);
            let pb = base.pixelate(b);
            bch.iter(|| base.quick_rasterize(pa, pb));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rasterize);
criterion_main!(benches);
