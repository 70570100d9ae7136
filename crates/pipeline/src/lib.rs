// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # pipeline
//!
//! The orchestrator that runs events through a chain of processing stages.
//!
//! The pipeline takes:
//! - [`Component`]s, each reading typed segments and writing its own.
//! - A [`RawBufferPool`](buffer_pool::RawBufferPool), possibly shared with
//!   other pipelines.
//! - A [`PipelineConfig`] (reuse margin, error policy, input limits).
//!
//! It gives every stage a [`DataBuffer`](data_buffer::DataBuffer), wires
//! each stage as a consumer of its parents' buffers, and per event drives
//! the fill/subscribe/release cycle so that every raw block is back in the
//! pool when the event is done.
//!
//! # Type-State Pipeline
//! ```text
//! Pipeline<Wiring> → Pipeline<Ready>
//! ```
//! Stages can only be added while wiring and events only processed once
//! ready. Transitions are compile-time checked.
//!
//! # Threads
//! A pipeline processes one event at a time through `&mut self`. Several
//! pipelines on different threads may share one pool.

mod component;
mod config;
mod error;
mod metrics;
mod pipeline;

pub use component::{Component, EventContext, InputBlock};
pub use config::PipelineConfig;
pub use error::{ComponentError, PipelineError};
pub use metrics::{EventMetrics, StageMetrics, StageStatus};
pub use pipeline::{EventReport, Pipeline, PipelineState, Ready, StageId, Wiring};
