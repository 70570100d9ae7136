// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # data-buffer
//!
//! Output buffers of a trigger processing chain. A producing stage fills a
//! pooled raw block and declares typed segments inside it; every
//! downstream stage registered as a consumer subscribes to the segments of
//! the types it accepts, reads them, and releases them again. When the
//! last consumer is done, the raw block goes back to the shared
//! [`buffer_pool::RawBufferPool`].
//!
//! # Key Components
//!
//! - [`DataBuffer`] — one stage's output: fill cycle, consumer registry,
//!   subscribe/release with automatic reset.
//! - [`DataType`] — 8-byte id + 4-byte origin tag with wildcards.
//! - [`DataSegment`] / [`BlockDescriptor`] — declared and handed-out regions.
//! - [`ConsumerRecord`] — one consumer's state and checked-out blocks.
//!
//! # Cycle
//! ```text
//! begin_fill ─► write ─► declare_segments ─► subscribe* ─► release* ─► reset
//!     ▲                                                                  │
//!     └──────────────────────── next event ──────────────────────────────┘
//! ```

mod buffer;
mod consumer;
mod data_type;
mod error;
mod segment;

pub use buffer::{BufferPhase, DataBuffer};
pub use consumer::{ConsumerId, ConsumerRecord, ConsumerState};
pub use data_type::{DataType, ID_LEN, ORIGIN_LEN};
pub use error::BufferError;
pub use segment::{BlockDescriptor, DataSegment, SegmentKey, Subscription};
