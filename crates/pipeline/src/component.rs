// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The processing-component contract.
//!
//! A component sees its inputs as read-only byte slices inside the parent
//! stages' buffers and writes its output straight into the raw block of its
//! own buffer. It never touches the buffers' bookkeeping; the
//! [`Pipeline`](crate::Pipeline) subscribes, releases and recycles on its
//! behalf.

use crate::{ComponentError, StageId};
use data_buffer::{BlockDescriptor, DataSegment, DataType};

/// Per-event information handed to [`Component::process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventContext {
    /// Id of the event being processed.
    pub event_id: u64,
    /// Stage running the component.
    pub stage: StageId,
}

/// One input block: a segment of a parent's buffer.
#[derive(Debug, Clone, Copy)]
pub struct InputBlock<'a> {
    /// Stage that produced the block.
    pub parent: StageId,
    /// Segment descriptor as handed out by the parent's buffer.
    pub block: BlockDescriptor,
    /// The segment's bytes.
    pub data: &'a [u8],
}

impl InputBlock<'_> {
    pub fn data_type(&self) -> DataType {
        self.block.data_type
    }

    pub fn specification(&self) -> u32 {
        self.block.specification
    }
}

/// A stage of the processing chain.
///
/// # Example
/// ```
/// use data_buffer::{DataSegment, DataType};
/// use pipeline::{Component, ComponentError, EventContext, InputBlock};
///
/// /// Emits the event id as eight little-endian bytes.
/// struct EventStamp {
///     out: DataType,
/// }
///
/// impl Component for EventStamp {
///     fn name(&self) -> &str {
///         "stamp"
///     }
///
///     fn input_types(&self) -> &[DataType] {
///         &[]
///     }
///
///     fn output_size(&self, _inputs: &[InputBlock<'_>]) -> usize {
///         8
///     }
///
///     fn process(
///         &mut self,
///         ctx: &EventContext,
///         _inputs: &[InputBlock<'_>],
///         output: &mut [u8],
///     ) -> Result<Vec<DataSegment>, ComponentError> {
///         output.copy_from_slice(&ctx.event_id.to_le_bytes());
///         Ok(vec![DataSegment::new(0, 8, self.out, 0)])
///     }
/// }
/// ```
pub trait Component: Send {
    /// Unique name of the stage within its pipeline.
    fn name(&self) -> &str;

    /// Types this component reads from its parents. Sources return an
    /// empty slice.
    fn input_types(&self) -> &[DataType];

    /// Bytes to reserve for the output of this event.
    fn output_size(&self, inputs: &[InputBlock<'_>]) -> usize;

    /// Blocks to take from each parent per event. `None` uses the
    /// pipeline-wide limit.
    fn max_input_blocks(&self) -> Option<usize> {
        None
    }

    /// Processes one event: reads `inputs`, writes into `output` and
    /// returns the segments it wrote. The segments must lie within
    /// `output`.
    fn process(
        &mut self,
        ctx: &EventContext,
        inputs: &[InputBlock<'_>],
        output: &mut [u8],
    ) -> Result<Vec<DataSegment>, ComponentError>;
}
