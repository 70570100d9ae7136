// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for data buffer operations.
//!
//! Every variant is a structural misuse by the calling stage. A release
//! that does not match a checked-out block is deliberately absent: it is
//! logged and tolerated so one misbehaving consumer cannot hold up the
//! recycling of a buffer shared with others.

use crate::{BufferPhase, ConsumerId, ConsumerState};

/// Errors returned by [`DataBuffer`](crate::DataBuffer) operations.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// Subscribe on a buffer that holds no declared data.
    #[error("buffer '{buffer}' holds no data")]
    NoData { buffer: String },

    /// The consumer id is not registered, or the consumer is in the wrong
    /// stage of the cycle for the operation (subscribing after it released,
    /// releasing while it holds nothing).
    #[error("{consumer} on buffer '{buffer}': {}", staging(.state))]
    UnknownConsumer {
        buffer: String,
        consumer: ConsumerId,
        /// Current state of a registered consumer, `None` if unregistered.
        state: Option<ConsumerState>,
    },

    /// Subscribe by a consumer that already holds blocks this cycle.
    #[error("consumer '{consumer}' is already subscribed to '{buffer}'")]
    AlreadyActive { buffer: String, consumer: String },

    /// No declared segment matches the consumer's accepted types.
    #[error("no segment in '{buffer}' matches the input types of '{consumer}'")]
    NoMatch { buffer: String, consumer: String },

    /// A declared segment reaches past the used size of the raw buffer.
    #[error(
        "segment {index} of '{buffer}' ({offset}+{length}) exceeds used size {used_size}"
    )]
    SegmentOverflow {
        buffer: String,
        index: usize,
        offset: usize,
        length: usize,
        used_size: usize,
    },

    /// `begin_fill` before the previous cycle was reset.
    #[error("buffer '{buffer}' cannot start a fill while {phase}")]
    FillInProgress { buffer: String, phase: BufferPhase },

    /// Fill-side operation outside of a fill.
    #[error("buffer '{buffer}' is not being filled ({phase})")]
    NotFilling { buffer: String, phase: BufferPhase },

    /// A consumer with this name is already registered.
    #[error("consumer '{consumer}' is already registered with '{buffer}'")]
    DuplicateConsumer { buffer: String, consumer: String },

    /// A data type string could not be parsed.
    #[error("invalid data type {0}")]
    InvalidDataType(String),

    /// The raw buffer pool rejected an operation.
    #[error("pool error: {0}")]
    Pool(#[from] buffer_pool::PoolError),
}

fn staging(state: &Option<ConsumerState>) -> String {
    match state {
        Some(state) => format!("wrong stage, consumer is {state}"),
        None => "not registered".to_string(),
    }
}
