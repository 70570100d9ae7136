// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the processing chain.

use crate::StageId;

/// Errors returned by [`Pipeline`](crate::Pipeline) operations.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A parent id does not name a stage added earlier.
    #[error("unknown stage {0}")]
    UnknownStage(StageId),

    /// Two stages share a name.
    #[error("a stage named '{0}' already exists")]
    DuplicateStage(String),

    /// A component failed and the pipeline is configured to abort the event.
    #[error("stage '{stage}' failed on event {event_id}: {source}")]
    StageFailed {
        stage: String,
        event_id: u64,
        #[source]
        source: ComponentError,
    },

    /// A data buffer rejected an operation the orchestrator issued.
    #[error("buffer error: {0}")]
    Buffer(#[from] data_buffer::BufferError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors a [`Component`](crate::Component) reports from `process`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComponentError {
    /// The component produced more data than `output_size` reserved.
    #[error("output needs {needed} bytes but only {available} were reserved")]
    OutputTooSmall { needed: usize, available: usize },

    /// An input block could not be interpreted.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Any other processing failure.
    #[error("{0}")]
    Failed(String),

    /// The component declared a segment outside the bytes it was given.
    #[error("declared segments rejected: {0}")]
    BadSegments(String),
}
