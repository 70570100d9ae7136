// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for block reuse versus fresh allocation.

use buffer_pool::{RawBufferPool, ReuseMargin};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_acquire_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("acquire_release");

    for size in [4 * 1024, 256 * 1024, 4 * 1024 * 1024] {
        group.bench_with_input(BenchmarkId::new("reuse", size), &size, |b, &size| {
            let pool = RawBufferPool::new(ReuseMargin::from_kb(1));
            b.iter(|| {
                let raw = pool.acquire(black_box(size));
                pool.release(raw).unwrap();
            });
        });

        group.bench_with_input(BenchmarkId::new("no_reuse", size), &size, |b, &size| {
            let pool = RawBufferPool::new(ReuseMargin::from_bytes(0));
            b.iter(|| {
                let raw = pool.acquire(black_box(size));
                pool.release(raw).unwrap();
                pool.teardown();
            });
        });
    }

    group.finish();
}

fn bench_jittered_sizes(c: &mut Criterion) {
    let pool = RawBufferPool::new(ReuseMargin::from_kb(1));
    let sizes: Vec<usize> = (0..64).map(|i| 64 * 1024 - (i * 13) % 900).collect();

    c.bench_function("jittered_event_sizes", |b| {
        let mut i = 0;
        b.iter(|| {
            let raw = pool.acquire(black_box(sizes[i % sizes.len()]));
            pool.release(raw).unwrap();
            i += 1;
        });
    });
}

criterion_group!(benches, bench_acquire_release, bench_jittered_sizes);
criterion_main!(benches);
