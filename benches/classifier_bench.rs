use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quote_loadgen::classifier::{classify, TrafficMix};
use quote_loadgen::coordinate::Coordinate;
use quote_loadgen::rng::Mulberry32;

const VUS: u32 = 50;
const ITERS: u32 = 200;

fn bench_classifier(c: &mut Criterion) {
    let mut group = c.benchmark_group("classifier");
    let size_label = format!("{}x{}", VUS, ITERS);

    for (replay, conflict) in [(2, 1), (10, 5), (50, 50)] {
        let mix = TrafficMix::new(replay, conflict).expect("mix should be valid");
        group.bench_with_input(
            BenchmarkId::new(format!("classify-{}-{}", replay, conflict), &size_label),
            &mix,
            |b, mix| {
                b.iter(|| {
                    for vu in 1..=VUS {
                        for iter in 0..ITERS {
                            black_box(classify(Coordinate::new(vu, iter), mix));
                        }
                    }
                });
            },
        );
    }

    group.bench_function("mulberry32_next_f64", |b| {
        let mut rng = Mulberry32::new(12345);
        b.iter(|| black_box(rng.next_f64()));
    });

    group.finish();
}

criterion_group!(benches, bench_classifier);
criterion_main!(benches);
