// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The processing chain with a type-state–enforced build phase.
//!
//! ```text
//! Pipeline<Wiring>
//!     │  .add_stage(component, parents) ...
//!     │  .wire()
//!     ▼
//! Pipeline<Ready>
//!     │  .process_event(id) ...
//!     ▼
//!   EventReport
//! ```
//!
//! Every stage owns one [`DataBuffer`]. Wiring registers each stage as a
//! consumer of its parents' buffers. Per event, stages run in insertion
//! order, which is a dependency order because parents must exist before
//! their children are added.

use crate::{
    Component, ComponentError, EventContext, EventMetrics, InputBlock, PipelineConfig,
    PipelineError, StageMetrics, StageStatus,
};
use buffer_pool::RawBufferPool;
use data_buffer::{BlockDescriptor, BufferError, BufferPhase, ConsumerId, DataBuffer};
use std::fmt;
use std::marker::PhantomData;
use std::time::Instant;

/// Index of a stage within its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct StageId(usize);

impl StageId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage#{}", self.0)
    }
}

// ── Type-state markers ─────────────────────────────────────────

/// Stages are being added.
#[derive(Debug)]
pub struct Wiring;

/// Consumers are registered; events can be processed.
#[derive(Debug)]
pub struct Ready;

/// Sealed trait for pipeline states.
pub trait PipelineState: fmt::Debug {}
impl PipelineState for Wiring {}
impl PipelineState for Ready {}

// ── Event report ───────────────────────────────────────────────

/// The result of processing one event.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EventReport {
    pub event_id: u64,
    /// Buffers that still held data once every stage had run. They were
    /// reset, but some consumer did not give its blocks back.
    pub leaked_buffers: Vec<String>,
    /// Per-stage and overall metrics.
    pub metrics: EventMetrics,
}

impl EventReport {
    /// Returns `true` if every stage ran and nothing leaked.
    pub fn is_clean(&self) -> bool {
        self.leaked_buffers.is_empty() && self.metrics.failed() == 0
    }
}

// ── Stage ──────────────────────────────────────────────────────

/// A block a stage has subscribed to and not yet released.
#[derive(Debug, Clone, Copy)]
struct HeldBlock {
    parent: StageId,
    consumer: ConsumerId,
    block: BlockDescriptor,
}

struct Stage {
    component: Box<dyn Component>,
    buffer: DataBuffer,
    parents: Vec<StageId>,
    /// Children and the consumer id each has in this stage's buffer.
    children: Vec<(StageId, ConsumerId)>,
    held: Vec<HeldBlock>,
}

// ── Pipeline ───────────────────────────────────────────────────

/// A chain of processing stages sharing one raw buffer pool.
///
/// # Example
/// ```
/// use data_buffer::{DataSegment, DataType};
/// use pipeline::{Component, ComponentError, EventContext, InputBlock, Pipeline, PipelineConfig};
///
/// struct Source;
///
/// impl Component for Source {
///     fn name(&self) -> &str { "source" }
///     fn input_types(&self) -> &[DataType] { &[] }
///     fn output_size(&self, _: &[InputBlock<'_>]) -> usize { 16 }
///     fn process(
///         &mut self,
///         _: &EventContext,
///         _: &[InputBlock<'_>],
///         output: &mut [u8],
///     ) -> Result<Vec<DataSegment>, ComponentError> {
///         output.fill(7);
///         Ok(vec![DataSegment::new(0, 16, DataType::new("RAW", "SRC").unwrap(), 0)])
///     }
/// }
///
/// let mut builder = Pipeline::from_config(PipelineConfig::default()).unwrap();
/// builder.add_stage(Source, &[]).unwrap();
/// let mut pipeline = builder.wire().unwrap();
///
/// let report = pipeline.process_event(1).unwrap();
/// assert!(report.is_clean());
/// assert_eq!(pipeline.pool().active_blocks(), 0);
/// ```
pub struct Pipeline<S: PipelineState = Wiring> {
    config: PipelineConfig,
    pool: RawBufferPool,
    stages: Vec<Stage>,
    events_processed: u64,
    _state: PhantomData<S>,
}

// ── Wiring ─────────────────────────────────────────────────────

impl Pipeline<Wiring> {
    /// Creates an empty pipeline drawing from `pool`, which may be shared
    /// with other pipelines.
    pub fn new(config: PipelineConfig, pool: RawBufferPool) -> Result<Self, PipelineError> {
        config.validate()?;
        tracing::info!("pipeline created, reuse margin {}", pool.margin());
        Ok(Self {
            config,
            pool,
            stages: Vec::new(),
            events_processed: 0,
            _state: PhantomData,
        })
    }

    /// Creates an empty pipeline with its own pool, using the configured
    /// reuse margin.
    pub fn from_config(config: PipelineConfig) -> Result<Self, PipelineError> {
        let margin = config.parse_margin()?;
        Self::new(config, RawBufferPool::new(margin))
    }

    /// Appends a stage consuming the output of `parents`.
    pub fn add_stage(
        &mut self,
        component: impl Component + 'static,
        parents: &[StageId],
    ) -> Result<StageId, PipelineError> {
        self.add_boxed_stage(Box::new(component), parents)
    }

    /// [`add_stage`](Self::add_stage) for an already boxed component.
    pub fn add_boxed_stage(
        &mut self,
        component: Box<dyn Component>,
        parents: &[StageId],
    ) -> Result<StageId, PipelineError> {
        let name = component.name().to_string();
        if self.stage_id(&name).is_some() {
            return Err(PipelineError::DuplicateStage(name));
        }
        for (i, parent) in parents.iter().enumerate() {
            if parent.0 >= self.stages.len() {
                return Err(PipelineError::UnknownStage(*parent));
            }
            if parents[..i].contains(parent) {
                return Err(PipelineError::Config(format!(
                    "stage '{name}' lists parent {parent} twice"
                )));
            }
        }

        let id = StageId(self.stages.len());
        tracing::debug!("added stage '{name}' as {id} with {} parents", parents.len());
        self.stages.push(Stage {
            buffer: DataBuffer::new(name, self.pool.clone()),
            component,
            parents: parents.to_vec(),
            children: Vec::new(),
            held: Vec::new(),
        });
        Ok(id)
    }

    /// Registers every stage as a consumer of its parents' buffers.
    /// Transitions to the `Ready` state.
    pub fn wire(mut self) -> Result<Pipeline<Ready>, PipelineError> {
        for index in 0..self.stages.len() {
            let (before, rest) = self.stages.split_at_mut(index);
            let Some(stage) = rest.first() else { break };

            for parent in &stage.parents {
                let parent_stage = before
                    .get_mut(parent.0)
                    .ok_or(PipelineError::UnknownStage(*parent))?;
                let consumer = parent_stage
                    .buffer
                    .register_consumer(stage.component.name(), stage.component.input_types())?;
                parent_stage.children.push((StageId(index), consumer));
            }
        }

        tracing::info!("pipeline wired: {} stages", self.stages.len());
        Ok(Pipeline {
            config: self.config,
            pool: self.pool,
            stages: self.stages,
            events_processed: 0,
            _state: PhantomData,
        })
    }
}

// ── Ready: process events ──────────────────────────────────────

impl Pipeline<Ready> {
    /// Runs one event through every stage.
    ///
    /// For each stage in order:
    /// 1. Collect the blocks it subscribed to. A stage with parents but no
    ///    blocks is skipped.
    /// 2. Fill its buffer through the component and declare the segments.
    ///    A failing component has its fill aborted, so children see nothing.
    /// 3. Release its input blocks.
    /// 4. Subscribe every child to the fresh output before any of them can
    ///    release, so siblings cannot reset the buffer under each other. An
    ///    output nobody wants is recycled at once.
    ///
    /// With `abort_on_error` the first failure skips the remaining stages
    /// and is returned after cleanup. Buffers still holding data at the end
    /// are reset and reported as leaked.
    pub fn process_event(&mut self, event_id: u64) -> Result<EventReport, PipelineError> {
        let start = Instant::now();
        tracing::debug!("event {event_id}: {} stages", self.stages.len());

        let mut metrics = EventMetrics::new(self.stages.len());
        let outcome = self.run_event(event_id, &mut metrics);
        let leaked_buffers = self.finish_event(event_id);
        self.events_processed += 1;
        outcome?;

        metrics.finalise(
            start.elapsed(),
            self.pool.active_blocks(),
            self.pool.free_blocks(),
        );
        tracing::debug!("event {event_id}: {}", metrics.summary());

        Ok(EventReport {
            event_id,
            leaked_buffers,
            metrics,
        })
    }

    /// Number of `process_event` calls so far, failed ones included.
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Child stages of `id`, in wiring order.
    pub fn children(&self, id: StageId) -> Vec<StageId> {
        self.stages
            .get(id.0)
            .map(|s| s.children.iter().map(|(child, _)| *child).collect())
            .unwrap_or_default()
    }

    // ── Private helpers ────────────────────────────────────────

    fn run_event(
        &mut self,
        event_id: u64,
        metrics: &mut EventMetrics,
    ) -> Result<(), PipelineError> {
        let mut failure = None;

        for index in 0..self.stages.len() {
            if failure.is_some() {
                let name = self.stages[index].component.name();
                metrics.record_stage(StageMetrics::new(name));
                continue;
            }

            let (stage_metrics, error) = self.run_stage(index, event_id)?;
            metrics.record_stage(stage_metrics);

            if let Some(source) = error {
                if self.config.abort_on_error {
                    failure = Some(PipelineError::StageFailed {
                        stage: self.stages[index].component.name().to_string(),
                        event_id,
                        source,
                    });
                }
            }
        }

        failure.map_or(Ok(()), Err)
    }

    fn run_stage(
        &mut self,
        index: usize,
        event_id: u64,
    ) -> Result<(StageMetrics, Option<ComponentError>), PipelineError> {
        let default_cap = self.config.max_input_blocks;
        let (before, rest) = self.stages.split_at_mut(index);
        let Some((stage, after)) = rest.split_first_mut() else {
            return Err(PipelineError::UnknownStage(StageId(index)));
        };

        let held = std::mem::take(&mut stage.held);
        let name = stage.component.name().to_string();
        let mut metrics = StageMetrics::new(name.as_str());
        metrics.input_blocks = held.len();

        if !stage.parents.is_empty() && held.is_empty() {
            tracing::debug!("event {event_id}: stage '{name}' has no input, skipped");
            return Ok((metrics, None));
        }

        // ── Run the component ──────────────────────────────────
        let started = Instant::now();
        let outcome = {
            let inputs: Vec<InputBlock<'_>> = held
                .iter()
                .filter_map(|h| {
                    let data = before.get(h.parent.0)?.buffer.block_data(&h.block)?;
                    Some(InputBlock {
                        parent: h.parent,
                        block: h.block,
                        data,
                    })
                })
                .collect();

            let ctx = EventContext {
                event_id,
                stage: StageId(index),
            };
            let size = stage.component.output_size(&inputs);
            let output = match stage.buffer.begin_fill(size) {
                Ok(output) => output,
                Err(e) => {
                    stage.held = held;
                    return Err(e.into());
                }
            };
            metrics.output_bytes = size;
            stage.component.process(&ctx, &inputs, output)
        };
        metrics.duration = started.elapsed();

        let error = match outcome {
            Ok(segments) => match stage.buffer.declare_segments(&segments) {
                Ok(()) => {
                    metrics.output_segments = segments.len();
                    None
                }
                Err(e) => Some(ComponentError::BadSegments(e.to_string())),
            },
            Err(e) => Some(e),
        };

        if let Some(e) = &error {
            tracing::warn!("event {event_id}: stage '{name}' failed: {e}");
            if let Err(abort) = stage.buffer.abort_fill() {
                tracing::warn!("event {event_id}: could not abort fill of '{name}': {abort}");
            }
            metrics.status = StageStatus::Failed(e.to_string());
            metrics.output_bytes = 0;
        } else {
            metrics.status = StageStatus::Processed;
        }

        // ── Give the inputs back ───────────────────────────────
        for h in &held {
            let released = before
                .get_mut(h.parent.0)
                .map(|parent| parent.buffer.release_block(h.consumer, &h.block));
            if let Some(Err(e)) = released {
                tracing::warn!("event {event_id}: stage '{name}' could not release input: {e}");
            }
        }

        // ── Hand the output to the children ────────────────────
        if stage.buffer.phase() == BufferPhase::Ready {
            for &(child, consumer) in &stage.children {
                let Some(child_stage) = child
                    .0
                    .checked_sub(index + 1)
                    .and_then(|k| after.get_mut(k))
                else {
                    return Err(PipelineError::UnknownStage(child));
                };
                let cap = child_stage
                    .component
                    .max_input_blocks()
                    .unwrap_or(default_cap);

                match stage.buffer.subscribe(consumer, cap) {
                    Ok(sub) => {
                        if sub.is_truncated() {
                            tracing::warn!(
                                "event {event_id}: '{}' takes {} of {} blocks from '{name}'",
                                child_stage.component.name(),
                                sub.blocks.len(),
                                sub.total_matches,
                            );
                        }
                        child_stage.held.extend(sub.blocks.into_iter().map(|block| HeldBlock {
                            parent: StageId(index),
                            consumer,
                            block,
                        }));
                    }
                    Err(BufferError::NoMatch { .. }) => {}
                    Err(e) => return Err(e.into()),
                }
            }

            if stage.buffer.active_consumers() == 0 {
                stage.buffer.reset();
            }
        }

        Ok((metrics, error))
    }

    /// Releases blocks still held by stages that never ran and resets any
    /// buffer left with data. Returns the names of those buffers.
    fn finish_event(&mut self, event_id: u64) -> Vec<String> {
        for index in 0..self.stages.len() {
            let (before, rest) = self.stages.split_at_mut(index);
            let Some(stage) = rest.first_mut() else { break };

            for h in std::mem::take(&mut stage.held) {
                if let Some(parent) = before.get_mut(h.parent.0) {
                    if let Err(e) = parent.buffer.release_block(h.consumer, &h.block) {
                        tracing::warn!("event {event_id}: late release failed: {e}");
                    }
                }
            }
        }

        let mut leaked = Vec::new();
        for stage in &mut self.stages {
            if stage.buffer.has_data() {
                tracing::warn!(
                    "event {event_id}: buffer '{}' still holds data, resetting",
                    stage.buffer.name(),
                );
                stage.buffer.reset();
                leaked.push(stage.buffer.name().to_string());
            }
        }
        leaked
    }
}

// ── Common accessors ───────────────────────────────────────────

impl<S: PipelineState> Pipeline<S> {
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The pool all stage buffers draw from.
    pub fn pool(&self) -> &RawBufferPool {
        &self.pool
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Looks up a stage by component name.
    pub fn stage_id(&self, name: &str) -> Option<StageId> {
        self.stages
            .iter()
            .position(|s| s.component.name() == name)
            .map(StageId)
    }

    pub fn stage_name(&self, id: StageId) -> Option<&str> {
        self.stages.get(id.0).map(|s| s.component.name())
    }

    /// Output buffer of a stage.
    pub fn buffer(&self, id: StageId) -> Option<&DataBuffer> {
        self.stages.get(id.0).map(|s| &s.buffer)
    }

    pub fn parents(&self, id: StageId) -> &[StageId] {
        self.stages
            .get(id.0)
            .map(|s| s.parents.as_slice())
            .unwrap_or(&[])
    }
}

impl<S: PipelineState> fmt::Debug for Pipeline<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.stages.iter().map(|s| s.component.name()).collect();
        f.debug_struct("Pipeline")
            .field("state", &std::any::type_name::<S>())
            .field("stages", &names)
            .field("abort_on_error", &self.config.abort_on_error)
            .field("events_processed", &self.events_processed)
            .finish()
    }
}
