// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for running events through chains of different widths.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use data_buffer::{DataSegment, DataType};
use pipeline::{Component, ComponentError, EventContext, InputBlock, Pipeline, PipelineConfig};

struct Source {
    size: usize,
    out: DataType,
}

impl Component for Source {
    fn name(&self) -> &str {
        "source"
    }

    fn input_types(&self) -> &[DataType] {
        &[]
    }

    fn output_size(&self, _: &[InputBlock<'_>]) -> usize {
        self.size
    }

    fn process(
        &mut self,
        ctx: &EventContext,
        _: &[InputBlock<'_>],
        output: &mut [u8],
    ) -> Result<Vec<DataSegment>, ComponentError> {
        output.fill(ctx.event_id as u8);
        Ok(vec![DataSegment::new(0, output.len(), self.out, 0)])
    }
}

struct Checksum {
    name: String,
    inputs: [DataType; 1],
}

impl Component for Checksum {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_types(&self) -> &[DataType] {
        &self.inputs
    }

    fn output_size(&self, _: &[InputBlock<'_>]) -> usize {
        8
    }

    fn process(
        &mut self,
        _: &EventContext,
        inputs: &[InputBlock<'_>],
        output: &mut [u8],
    ) -> Result<Vec<DataSegment>, ComponentError> {
        let sum: u64 = inputs
            .iter()
            .flat_map(|i| i.data.iter())
            .map(|&b| b as u64)
            .sum();
        output.copy_from_slice(&sum.to_le_bytes());
        Ok(vec![DataSegment::new(0, 8, DataType::ANY, 0)])
    }
}

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");

    for width in [1usize, 4, 16] {
        group.bench_with_input(BenchmarkId::new("consumers", width), &width, |b, &width| {
            let mut builder = Pipeline::from_config(PipelineConfig::default()).unwrap();
            let source = builder
                .add_stage(
                    Source {
                        size: 16 * 1024,
                        out: "RAW:SRC".parse().unwrap(),
                    },
                    &[],
                )
                .unwrap();
            for i in 0..width {
                builder
                    .add_stage(
                        Checksum {
                            name: format!("checksum-{i}"),
                            inputs: ["RAW".parse().unwrap()],
                        },
                        &[source],
                    )
                    .unwrap();
            }
            let mut pipeline = builder.wire().unwrap();

            let mut event_id = 0u64;
            b.iter(|| {
                event_id += 1;
                black_box(pipeline.process_event(event_id).unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fan_out);
criterion_main!(benches);
