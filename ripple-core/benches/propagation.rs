//! Benchmark: write propagation through memo chains and effect fan-out

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ripple_core::{Memo, Runtime};

fn memo_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("memo_chain");
    for depth in [1usize, 16, 128] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let rt = Runtime::new();
            let source = rt.signal(0u64);

            let mut tail: Memo<u64> = rt.memo({
                let source = source.clone();
                move || source.get() + 1
            });
            for _ in 1..depth {
                let prev = tail.clone();
                tail = rt.memo(move || prev.get() + 1);
            }

            let mut value = 0u64;
            b.iter(|| {
                value += 1;
                source.set(value);
                black_box(tail.get())
            });
        });
    }
    group.finish();
}

fn effect_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("effect_fan_out");
    for width in [1usize, 64, 512] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            let rt = Runtime::new();
            let source = rt.signal(0u64);
            let effects: Vec<_> = (0..width)
                .map(|_| {
                    let source = source.clone();
                    rt.effect(move || {
                        black_box(source.get());
                    })
                })
                .collect();

            let mut value = 0u64;
            b.iter(|| {
                value += 1;
                source.set(value);
            });

            for effect in effects {
                effect.dispose();
            }
        });
    }
    group.finish();
}

fn batched_writes(c: &mut Criterion) {
    c.bench_function("batch_100_writes", |b| {
        let rt = Runtime::new();
        let source = rt.signal(0u64);
        let effect = rt.effect({
            let source = source.clone();
            move || {
                black_box(source.get());
            }
        });

        b.iter(|| {
            rt.batch(|| {
                for _ in 0..100 {
                    source.update(|v| v + 1);
                }
            })
        });

        effect.dispose();
    });
}

criterion_group!(benches, memo_chain, effect_fan_out, batched_writes);
criterion_main!(benches);
