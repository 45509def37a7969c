//! End-to-end build benchmarks across key-set sizes.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use maguro_benches::BenchKeys;
use maguro_core::MaguroBuilder;
use tempfile::TempDir;

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    group.sample_size(10);

    for &count in &[1_000_usize, 10_000, 100_000] {
        let keys = BenchKeys::generate("bench", count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &keys, |b, keys| {
            let dir = TempDir::new().expect("temp dir");
            let maguro = MaguroBuilder::new().build().expect("builder");
            let mut iteration = 0_u32;
            b.iter(|| {
                iteration += 1;
                let path = dir.path().join(format!("bench-{iteration}.pht"));
                maguro.build(keys, &path).expect("build must succeed")
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build);
criterion_main!(benches);
