//! Keyed Diff Benchmarks
//!
//! Measures reconciling keyed lists through the in-memory host: the LIS
//! helper alone, and full list patches for common reorder shapes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sprig_core::render::{h, longest_increasing_subsequence, MemoryHost, Renderer, VNode};

fn keyed_list(keys: &[usize]) -> VNode {
    h("ul").children(keys.iter().map(|k| h("li").key(*k).text(k.to_string())))
}

fn bench_lis(c: &mut Criterion) {
    let mut group = c.benchmark_group("lis");
    for size in [100usize, 1_000, 10_000] {
        // interleaved runs: 1, n, 2, n-1, ...
        let seq: Vec<usize> = (0..size)
            .map(|i| if i % 2 == 0 { i / 2 + 1 } else { size - i / 2 })
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &seq, |b, seq| {
            b.iter(|| longest_increasing_subsequence(black_box(seq)))
        });
    }
    group.finish();
}

fn bench_patch(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyed_patch");
    let size = 1_000usize;
    let base: Vec<usize> = (0..size).collect();

    let mut reversed = base.clone();
    reversed.reverse();
    let mut swapped = base.clone();
    swapped.swap(1, size - 2);
    let mut rotated = base.clone();
    rotated.rotate_right(1);
    let appended: Vec<usize> = (0..size + 100).collect();

    let cases = [
        ("reverse", reversed),
        ("swap_rows", swapped),
        ("rotate", rotated),
        ("append", appended),
    ];

    for (name, next) in cases {
        group.bench_function(name, |b| {
            b.iter_batched(
                || {
                    let mut host = MemoryHost::new();
                    let root = host.create_root();
                    let renderer = Renderer::new(host);
                    renderer
                        .render(Some(keyed_list(&base)), root)
                        .expect("initial mount");
                    (renderer, root, keyed_list(&next))
                },
                |(renderer, root, next)| {
                    renderer.render(Some(next), root).expect("patch");
                    renderer
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_lis, bench_patch);
criterion_main!(benches);
