// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-event processing metrics.
//!
//! [`EventMetrics`] records what each stage did with one event and how long
//! it took, plus the state of the shared pool afterwards.

use std::time::Duration;

/// What a stage did with an event.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum StageStatus {
    /// The component ran and its output was published.
    Processed,
    /// The stage had parents but none of them delivered a matching block.
    Skipped,
    /// The component or its declared output was rejected.
    Failed(String),
}

/// Metrics for one stage and one event.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StageMetrics {
    /// Stage name.
    pub stage_name: String,
    pub status: StageStatus,
    /// Blocks received from all parents.
    pub input_blocks: usize,
    /// Bytes reserved in the stage's buffer.
    pub output_bytes: usize,
    /// Segments declared by the component.
    pub output_segments: usize,
    /// Time spent in `output_size` and `process`.
    pub duration: Duration,
}

impl StageMetrics {
    /// Metrics of a stage that has not run (yet).
    pub fn new(stage_name: impl Into<String>) -> Self {
        Self {
            stage_name: stage_name.into(),
            status: StageStatus::Skipped,
            input_blocks: 0,
            output_bytes: 0,
            output_segments: 0,
            duration: Duration::ZERO,
        }
    }
}

/// Aggregate metrics for one event.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EventMetrics {
    /// Total wall-clock time for the event.
    pub total_duration: Duration,
    /// Per-stage metrics in processing order.
    pub stage_metrics: Vec<StageMetrics>,
    /// Blocks still lent out by the pool when the event finished.
    pub pool_active_blocks: usize,
    /// Blocks waiting in the pool's free list when the event finished.
    pub pool_free_blocks: usize,
}

impl EventMetrics {
    /// Creates an empty metrics container.
    pub fn new(num_stages: usize) -> Self {
        Self {
            total_duration: Duration::ZERO,
            stage_metrics: Vec::with_capacity(num_stages),
            pool_active_blocks: 0,
            pool_free_blocks: 0,
        }
    }

    /// Records the outcome of a single stage.
    pub fn record_stage(&mut self, stage: StageMetrics) {
        self.stage_metrics.push(stage);
    }

    /// Finalises metrics with the total time and the pool state.
    pub fn finalise(&mut self, total: Duration, pool_active: usize, pool_free: usize) {
        self.total_duration = total;
        self.pool_active_blocks = pool_active;
        self.pool_free_blocks = pool_free;
    }

    pub fn processed(&self) -> usize {
        self.count(|s| matches!(s, StageStatus::Processed))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, StageStatus::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, StageStatus::Failed(_)))
    }

    /// Bytes reserved across all stages that produced output.
    pub fn total_output_bytes(&self) -> usize {
        self.stage_metrics.iter().map(|s| s.output_bytes).sum()
    }

    /// Metrics of the named stage.
    pub fn stage(&self, name: &str) -> Option<&StageMetrics> {
        self.stage_metrics.iter().find(|s| s.stage_name == name)
    }

    /// Returns a human-readable one-line summary.
    pub fn summary(&self) -> String {
        let kb = self.total_output_bytes() as f64 / 1024.0;
        format!(
            "Event: {:.3}ms total, {} stages ({} processed, {} skipped, {} failed), \
             {:.1} KB output, pool {} active / {} free",
            self.total_duration.as_secs_f64() * 1000.0,
            self.stage_metrics.len(),
            self.processed(),
            self.skipped(),
            self.failed(),
            kb,
            self.pool_active_blocks,
            self.pool_free_blocks,
        )
    }

    fn count(&self, f: impl Fn(&StageStatus) -> bool) -> usize {
        self.stage_metrics.iter().filter(|s| f(&s.status)).count()
    }
}
