#[path = "../util/util.rs"]
mod util;

use util::synthetic_images;

use std::time::Duration;

use criterion::{
    criterion_group, criterion_main, measurement::WallTime, Bencher, BenchmarkId, Criterion,
    SamplingMode,
};
use pixquant::{
    kmeans::{self, KmeansOptions},
    PaletteSize, PixelBuffer, WeightedPoints,
};

fn bench(
    c: &mut Criterion,
    group: &str,
    mut f: impl FnMut(&mut Bencher<WallTime>, &(PaletteSize, &PixelBuffer)),
) {
    let mut group = c.benchmark_group(group);
    group
        .sample_size(20)
        .noise_threshold(0.05)
        .sampling_mode(SamplingMode::Flat)
        .warm_up_time(Duration::from_millis(500));

    for (k, secs) in [
        (PaletteSize::from_clamped(64), 6),
        (PaletteSize::from_clamped(16), 4),
        (PaletteSize::from_clamped(4), 2),
    ] {
        group.measurement_time(Duration::from_secs(secs));
        for (name, image) in synthetic_images() {
            group.bench_with_input(BenchmarkId::new(k.to_string(), name), &(k, image), &mut f);
        }
    }
}

fn weighted_points_single(c: &mut Criterion) {
    let mut group = c.benchmark_group("weighted_points_single");
    group.sample_size(30).noise_threshold(0.05);
    for (name, image) in synthetic_images() {
        group.bench_with_input(name, image, |b, image| {
            b.iter(|| WeightedPoints::new(image.pixels()))
        });
    }
}

fn weighted_points_par(c: &mut Criterion) {
    let mut group = c.benchmark_group("weighted_points_par");
    group.sample_size(30).noise_threshold(0.05);
    for (name, image) in synthetic_images() {
        group.bench_with_input(name, image, |b, image| {
            b.iter(|| WeightedPoints::new_par(image.pixels()))
        });
    }
}

fn kmeans_fidelity_4(c: &mut Criterion) {
    bench(c, "kmeans_fidelity_4", |b, &(k, image)| {
        let points = WeightedPoints::new_par(image.pixels());
        let options = KmeansOptions::new().fidelity(4);
        b.iter(|| kmeans::cluster_points(&points, k, &options))
    })
}

fn kmeans_fidelity_8(c: &mut Criterion) {
    bench(c, "kmeans_fidelity_8", |b, &(k, image)| {
        let points = WeightedPoints::new_par(image.pixels());
        let options = KmeansOptions::new().fidelity(8);
        b.iter(|| kmeans::cluster_points(&points, k, &options))
    })
}

criterion_group!(
    benches,
    weighted_points_single,
    weighted_points_par,
    kmeans_fidelity_4,
    kmeans_fidelity_8,
);
criterion_main!(benches);
