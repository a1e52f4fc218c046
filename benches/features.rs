use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use sermo::analysis::audio::{CANONICAL_LEN, SAMPLE_RATE};
use sermo::analysis::features::extract_features;

fn tone() -> Vec<f32> {
    (0..CANONICAL_LEN)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            0.3 * (2.0 * std::f32::consts::PI * 220.0 * t).sin()
                + 0.1 * (2.0 * std::f32::consts::PI * 1_760.0 * t).sin()
        })
        .collect()
}

fn bench_extract_features(c: &mut Criterion) {
    let samples = tone();
    c.bench_with_input(
        BenchmarkId::new("extract_features", CANONICAL_LEN),
        &samples,
        |b, samples| {
            b.iter(|| {
                extract_features(black_box(samples)).expect("extract_features");
            });
        },
    );
}

criterion_group!(benches, bench_extract_features);
criterion_main!(benches);
