use criterion::{black_box, criterion_group, criterion_main, Criterion};
use quarry_core::ops;
use quarry_core::DocumentList;

fn stepped(n: u32, step: u32) -> DocumentList { (0..n).map(|i| i * step).collect() }

fn bench_ops(c: &mut Criterion) {
    let evens = stepped(100_000, 2);
    let thirds = stepped(70_000, 3);
    let universe = stepped(200_000, 1);

    c.bench_function("and_100k", |b| b.iter(|| ops::and(black_box(&evens), black_box(&thirds))));
    c.bench_function("or_100k", |b| b.iter(|| ops::or(black_box(&evens), black_box(&thirds))));
    c.bench_function("not_200k_universe", |b| b.iter(|| ops::not(black_box(&evens), black_box(&universe))));
}

criterion_group!(benches, bench_ops);
criterion_main!(benches);
