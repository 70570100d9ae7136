// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # buffer-pool
//!
//! A process-wide pool of reusable raw memory blocks for the output
//! buffers of a trigger processing chain. Every event fills a handful of
//! buffers of roughly the same size as the previous event; recycling the
//! blocks avoids allocator churn on the hot path.
//!
//! # Key Components
//!
//! - [`RawBufferPool`] — the shared pool: a free list and an active list,
//!   first-fit reuse within a slack margin.
//! - [`RawBuffer`] — a block lent out of the pool. It carries the storage
//!   while active; the pool keeps only bookkeeping.
//! - [`ReuseMargin`] — the tolerated slack, with human-readable parsing
//!   (`"64"`, `"1K"`, ...).
//! - [`PoolStats`] — cumulative metrics (reuse ratio, peaks, rejected
//!   releases).
//! - [`TeardownReport`] — what teardown freed and which blocks leaked.
//!
//! # Ownership Model
//!
//! ```text
//! RawBufferPool::acquire(size)
//!       │  storage moved out of the free list
//!       ▼
//!   RawBuffer  ◄─── owns Vec<u8>, pool lists its id as active
//!       │
//!       │  RawBufferPool::release(raw)
//!       ▼
//!   free list  ◄─── storage moved back, ready for the next event
//! ```
//!
//! A block is therefore in exactly one place at any time: the free list or
//! the hands of a single borrower.
//!
//! # Example
//! ```
//! use buffer_pool::{RawBufferPool, ReuseMargin};
//!
//! let pool = RawBufferPool::new(ReuseMargin::default());
//!
//! let mut raw = pool.acquire(4096);
//! raw.as_mut_slice()[0] = 42;
//! assert_eq!(pool.active_blocks(), 1);
//!
//! pool.release(raw).unwrap();
//! assert_eq!(pool.free_blocks(), 1);
//! ```

mod error;
mod margin;
pub mod pool;
mod raw;
mod stats;

pub use error::PoolError;
pub use margin::ReuseMargin;
pub use pool::{RawBufferPool, TeardownReport};
pub use raw::{RawBuffer, RawBufferId};
pub use stats::PoolStats;
