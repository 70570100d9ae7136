// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for a full fill/subscribe/release cycle.

use buffer_pool::{RawBufferPool, ReuseMargin};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use data_buffer::{DataBuffer, DataSegment, DataType};

fn bench_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_cycle");
    let raw: DataType = "RAW:TPC".parse().unwrap();

    for consumers in [1usize, 4, 16] {
        group.bench_with_input(
            BenchmarkId::new("consumers", consumers),
            &consumers,
            |b, &consumers| {
                let pool = RawBufferPool::new(ReuseMargin::from_kb(1));
                let mut buffer = DataBuffer::new("reader", pool);
                let ids: Vec<_> = (0..consumers)
                    .map(|i| buffer.register_consumer(format!("c{i}"), &[raw]).unwrap())
                    .collect();
                let segments: Vec<_> = (0..8)
                    .map(|i| DataSegment::new(i * 1024, 1024, raw, i as u32))
                    .collect();

                b.iter(|| {
                    buffer.begin_fill(black_box(8 * 1024)).unwrap();
                    buffer.declare_segments(&segments).unwrap();
                    // Subscribe everyone first: the last release resets the buffer.
                    let held: Vec<_> = ids
                        .iter()
                        .map(|&id| (id, buffer.subscribe(id, 8).unwrap()))
                        .collect();
                    for (id, sub) in &held {
                        for block in &sub.blocks {
                            buffer.release_block(*id, block).unwrap();
                        }
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_matching(c: &mut Criterion) {
    let pool = RawBufferPool::default();
    let mut buffer = DataBuffer::new("reader", pool);
    let types: Vec<DataType> = ["RAW:TPC", "RAW:ITS", "CLUSTERS:TPC", "TRACKS:ITS"]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();

    buffer.begin_fill(64 * 256).unwrap();
    let segments: Vec<_> = (0..256)
        .map(|i| DataSegment::new(i * 64, 64, types[i % types.len()], 0))
        .collect();
    buffer.declare_segments(&segments).unwrap();
    let wanted: DataType = "********:TPC".parse().unwrap();

    c.bench_function("matching_256_segments", |b| {
        b.iter(|| buffer.matching_count(black_box(&[wanted])));
    });
}

criterion_group!(benches, bench_cycle, bench_matching);
criterion_main!(benches);
