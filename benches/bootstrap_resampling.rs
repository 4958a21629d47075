//! Bootstrap resampling benchmark
//!
//! The sensitivity report bootstraps every metric's mean with 10 000
//! resamples by default; this measures that cost as the series and the
//! iteration count grow.
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench bootstrap_resampling
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use deriva::stats::{bootstrap_mean, RngResampler};

fn series(len: usize) -> Vec<f64> {
    (0..len).map(|i| 0.1 + (i as f64 * 0.37).sin().abs() * 0.8).collect()
}

/// Benchmark: resamples of a seven-level series (one experiment run)
fn bench_bootstrap_iterations(c: &mut Criterion) {
    let mut group = c.benchmark_group("bootstrap_iterations");
    let values = series(7);

    for iterations in [1_000, 10_000, 50_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(iterations),
            &iterations,
            |b, &iterations| {
                let mut resampler = RngResampler::seeded(42);
                b.iter(|| {
                    bootstrap_mean(black_box(&values), iterations, &mut resampler)
                        .map(|d| d.mean())
                });
            },
        );
    }
    group.finish();
}

/// Benchmark: 10 000 resamples over series of increasing length
fn bench_bootstrap_series_length(c: &mut Criterion) {
    let mut group = c.benchmark_group("bootstrap_series_length");

    for len in [7, 70, 700] {
        let values = series(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &values, |b, values| {
            let mut resampler = RngResampler::seeded(42);
            b.iter(|| bootstrap_mean(black_box(values), 10_000, &mut resampler).map(|d| d.std()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_bootstrap_iterations,
    bench_bootstrap_series_length
);
criterion_main!(benches);
