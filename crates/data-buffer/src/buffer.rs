// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The output buffer of one pipeline stage.
//!
//! ```text
//!            begin_fill            declare_segments
//!   Empty ───────────────► Filling ────────────────► Ready
//!     ▲                      │ abort_fill / no segments  │
//!     ├──────────────────────┘                           │
//!     └──────────── reset (last release) ────────────────┘
//! ```
//!
//! While `Ready`, registered consumers subscribe to the segments matching
//! their input types and release them one by one. The release that leaves
//! no consumer active resets the buffer: every record goes back to
//! `Pending` and the raw block returns to the shared pool. Reset is the
//! only way a filled block goes back, so each block is recycled exactly
//! once per cycle.

use crate::{
    BlockDescriptor, BufferError, ConsumerId, ConsumerRecord, ConsumerState, DataSegment,
    DataType, SegmentKey, Subscription,
};
use buffer_pool::{RawBuffer, RawBufferId, RawBufferPool};
use std::collections::BTreeMap;
use std::fmt;

/// Fill-cycle phase of a [`DataBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum BufferPhase {
    /// No raw block held.
    Empty,
    /// A producer is writing into the raw block.
    Filling,
    /// Segments are declared and can be subscribed to.
    Ready,
}

impl fmt::Display for BufferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferPhase::Empty => write!(f, "empty"),
            BufferPhase::Filling => write!(f, "filling"),
            BufferPhase::Ready => write!(f, "ready"),
        }
    }
}

/// A segmented, multi-consumer output buffer backed by a pooled raw block.
///
/// # Example
/// ```
/// use buffer_pool::RawBufferPool;
/// use data_buffer::{DataBuffer, DataSegment, DataType};
///
/// let raw_type: DataType = "DDL_RAW:TPC".parse().unwrap();
/// let mut buffer = DataBuffer::new("tpc-reader", RawBufferPool::default());
/// let tracker = buffer.register_consumer("tracker", &[raw_type]).unwrap();
///
/// // Producer side.
/// let out = buffer.begin_fill(64).unwrap();
/// out.fill(1);
/// buffer.declare_segments(&[DataSegment::new(0, 64, raw_type, 0)]).unwrap();
///
/// // Consumer side.
/// let sub = buffer.subscribe(tracker, 8).unwrap();
/// assert_eq!(sub.blocks.len(), 1);
/// assert_eq!(buffer.block_data(&sub.blocks[0]).unwrap(), &[1u8; 64][..]);
///
/// // The last release recycles the block.
/// buffer.release_block(tracker, &sub.blocks[0]).unwrap();
/// assert!(!buffer.has_data());
/// ```
pub struct DataBuffer {
    name: String,
    pool: RawBufferPool,
    raw: Option<RawBuffer>,
    phase: BufferPhase,
    segments: Vec<DataSegment>,
    consumers: BTreeMap<ConsumerId, ConsumerRecord>,
    next_consumer: u32,
}

impl DataBuffer {
    /// Creates an empty buffer that draws raw blocks from `pool`.
    pub fn new(name: impl Into<String>, pool: RawBufferPool) -> Self {
        Self {
            name: name.into(),
            pool,
            raw: None,
            phase: BufferPhase::Empty,
            segments: Vec::new(),
            consumers: BTreeMap::new(),
            next_consumer: 0,
        }
    }

    // ── Fill side ─────────────────────────────────────────────────

    /// Acquires a raw block of at least `min_size` bytes and returns the
    /// writable region. Contents are not zeroed.
    ///
    /// Fails with [`BufferError::FillInProgress`] unless the buffer is
    /// [`BufferPhase::Empty`].
    pub fn begin_fill(&mut self, min_size: usize) -> Result<&mut [u8], BufferError> {
        if self.phase != BufferPhase::Empty {
            return Err(BufferError::FillInProgress {
                buffer: self.name.clone(),
                phase: self.phase,
            });
        }

        let raw = self.raw.insert(self.pool.acquire(min_size));
        self.phase = BufferPhase::Filling;
        tracing::debug!("'{}' filling {} ({min_size} bytes)", self.name, raw.id());
        Ok(raw.as_mut_slice())
    }

    /// Returns the writable region while a fill is in progress.
    pub fn fill_region(&mut self) -> Option<&mut [u8]> {
        match self.phase {
            BufferPhase::Filling => self.raw.as_mut().map(RawBuffer::as_mut_slice),
            _ => None,
        }
    }

    /// Declares the segments written by the producer and ends the fill.
    ///
    /// The batch is all-or-nothing: if any segment reaches past the used
    /// size, [`BufferError::SegmentOverflow`] is returned, nothing is
    /// recorded and the fill stays open. An empty batch ends the cycle at
    /// once and returns the raw block to the pool.
    pub fn declare_segments(&mut self, segments: &[DataSegment]) -> Result<(), BufferError> {
        if self.phase != BufferPhase::Filling {
            return Err(self.not_filling());
        }
        let used_size = self.used_size();

        if let Some((index, seg)) = segments
            .iter()
            .enumerate()
            .find(|(_, seg)| !seg.fits_in(used_size))
        {
            return Err(BufferError::SegmentOverflow {
                buffer: self.name.clone(),
                index,
                offset: seg.offset,
                length: seg.length,
                used_size,
            });
        }

        if segments.is_empty() {
            tracing::debug!("'{}' declared no segments, recycling", self.name);
            self.recycle_raw();
            self.phase = BufferPhase::Empty;
            return Ok(());
        }

        self.segments = segments.to_vec();
        self.phase = BufferPhase::Ready;
        tracing::debug!("'{}' ready with {} segments", self.name, segments.len());
        Ok(())
    }

    /// Abandons a fill in progress and returns the raw block to the pool.
    pub fn abort_fill(&mut self) -> Result<(), BufferError> {
        if self.phase != BufferPhase::Filling {
            return Err(self.not_filling());
        }
        self.phase = BufferPhase::Empty;
        match self.raw.take() {
            Some(raw) => Ok(self.pool.release(raw)?),
            None => Ok(()),
        }
    }

    // ── Registration & matching ───────────────────────────────────

    /// Registers a consumer accepting `accepted_types`.
    ///
    /// The new record starts out pending. Names are unique per buffer:
    /// registering the same name twice is an error, never a merge.
    pub fn register_consumer(
        &mut self,
        name: impl Into<String>,
        accepted_types: &[DataType],
    ) -> Result<ConsumerId, BufferError> {
        let name = name.into();
        if self.find_consumer(&name).is_some() {
            return Err(BufferError::DuplicateConsumer {
                buffer: self.name.clone(),
                consumer: name,
            });
        }

        let id = ConsumerId(self.next_consumer);
        self.next_consumer += 1;
        tracing::debug!("'{}' registered consumer '{name}' as {id}", self.name);
        self.consumers
            .insert(id, ConsumerRecord::new(id, name, accepted_types.to_vec()));
        Ok(id)
    }

    /// Declared segments whose type matches any of `accepted_types`, in
    /// declaration order. Repeated types are all returned.
    pub fn matching_segments(&self, accepted_types: &[DataType]) -> Vec<&DataSegment> {
        self.segments
            .iter()
            .filter(|seg| accepted_types.iter().any(|t| t.matches(&seg.data_type)))
            .collect()
    }

    /// Number of declared segments matching `accepted_types`.
    pub fn matching_count(&self, accepted_types: &[DataType]) -> usize {
        self.matching_segments(accepted_types).len()
    }

    // ── Subscribe / release ───────────────────────────────────────

    /// Checks out the segments matching the consumer's input types.
    ///
    /// At most `capacity` blocks are returned and recorded; the
    /// subscription also reports how many segments matched in total. The
    /// consumer moves from pending to active. A `capacity` of zero is a
    /// dry run: only the match count is reported and nothing changes.
    pub fn subscribe(
        &mut self,
        consumer: ConsumerId,
        capacity: usize,
    ) -> Result<Subscription, BufferError> {
        if self.phase != BufferPhase::Ready {
            return Err(BufferError::NoData {
                buffer: self.name.clone(),
            });
        }

        let Some(record) = self.consumers.get_mut(&consumer) else {
            return Err(BufferError::UnknownConsumer {
                buffer: self.name.clone(),
                consumer,
                state: None,
            });
        };

        match record.state() {
            ConsumerState::Pending => {}
            ConsumerState::Active => {
                return Err(BufferError::AlreadyActive {
                    buffer: self.name.clone(),
                    consumer: record.name().to_string(),
                })
            }
            ConsumerState::Released => {
                return Err(BufferError::UnknownConsumer {
                    buffer: self.name.clone(),
                    consumer,
                    state: Some(ConsumerState::Released),
                })
            }
        }

        let matches: Vec<BlockDescriptor> = self
            .segments
            .iter()
            .filter(|seg| record.accepts(&seg.data_type))
            .map(BlockDescriptor::from)
            .collect();

        if matches.is_empty() {
            return Err(BufferError::NoMatch {
                buffer: self.name.clone(),
                consumer: record.name().to_string(),
            });
        }

        let total_matches = matches.len();
        if capacity == 0 {
            return Ok(Subscription {
                blocks: Vec::new(),
                total_matches,
            });
        }

        let blocks: Vec<BlockDescriptor> = matches.into_iter().take(capacity).collect();
        for block in &blocks {
            record.hold(block.key());
        }
        let moved = record.transition(ConsumerState::Active);
        debug_assert!(moved.is_ok(), "pending consumer refused to activate");

        tracing::debug!(
            "'{}' subscribed by '{}': {} of {total_matches} blocks",
            self.name,
            record.name(),
            blocks.len(),
        );

        Ok(Subscription {
            blocks,
            total_matches,
        })
    }

    /// Gives back one checked-out block.
    ///
    /// A pair the consumer does not hold is logged and ignored. When the
    /// consumer's last block comes back it moves to released; when no
    /// consumer is active any more, the buffer resets.
    pub fn release(
        &mut self,
        consumer: ConsumerId,
        offset: usize,
        length: usize,
    ) -> Result<(), BufferError> {
        let Some(record) = self.consumers.get_mut(&consumer) else {
            return Err(BufferError::UnknownConsumer {
                buffer: self.name.clone(),
                consumer,
                state: None,
            });
        };

        if record.state() != ConsumerState::Active {
            return Err(BufferError::UnknownConsumer {
                buffer: self.name.clone(),
                consumer,
                state: Some(record.state()),
            });
        }

        let key = SegmentKey { offset, length };
        if !record.take(key) {
            tracing::warn!(
                "'{}': consumer '{}' released {key} which it does not hold; ignored",
                self.name,
                record.name(),
            );
            return Ok(());
        }

        if record.active_segments().is_empty() {
            let moved = record.transition(ConsumerState::Released);
            debug_assert!(moved.is_ok(), "active consumer refused to release");
            tracing::debug!("'{}': consumer '{}' released all blocks", self.name, record.name());
        }

        if self.active_consumers() == 0 {
            self.reset();
        }
        Ok(())
    }

    /// [`release`](Self::release) for a descriptor from a subscription.
    pub fn release_block(
        &mut self,
        consumer: ConsumerId,
        block: &BlockDescriptor,
    ) -> Result<(), BufferError> {
        self.release(consumer, block.offset, block.length)
    }

    /// Ends the fill cycle.
    ///
    /// Every consumer goes back to pending, segments are cleared and the
    /// raw block returns to the pool. Consumers that still hold blocks are
    /// logged as not having released; their number is returned.
    pub fn reset(&mut self) -> usize {
        let mut stragglers = 0;
        for record in self.consumers.values_mut() {
            if record.state() == ConsumerState::Active {
                let held = record.forget_all();
                stragglers += 1;
                tracing::warn!(
                    "'{}': consumer '{}' did not release {held} blocks before reset",
                    self.name,
                    record.name(),
                );
            }
            if record.state() != ConsumerState::Pending {
                let moved = record.transition(ConsumerState::Pending);
                debug_assert!(moved.is_ok(), "consumer refused to return to pending");
            }
        }

        self.segments.clear();
        self.recycle_raw();
        self.phase = BufferPhase::Empty;
        tracing::debug!("'{}' reset", self.name);
        stragglers
    }

    // ── Data access ───────────────────────────────────────────────

    /// Bytes of a subscribed block, or `None` if the buffer holds no such
    /// region.
    pub fn block_data(&self, block: &BlockDescriptor) -> Option<&[u8]> {
        self.region(block.offset, block.length)
    }

    /// Bytes of a declared segment.
    pub fn segment_data(&self, segment: &DataSegment) -> Option<&[u8]> {
        self.region(segment.offset, segment.length)
    }

    fn region(&self, offset: usize, length: usize) -> Option<&[u8]> {
        if self.phase != BufferPhase::Ready {
            return None;
        }
        let end = offset.checked_add(length)?;
        self.raw.as_ref()?.as_slice().get(offset..end)
    }

    // ── Introspection ─────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> BufferPhase {
        self.phase
    }

    /// Returns `true` while a raw block is held.
    pub fn has_data(&self) -> bool {
        self.raw.is_some()
    }

    pub fn segments(&self) -> &[DataSegment] {
        &self.segments
    }

    /// Used size of the held raw block, `0` when empty.
    pub fn used_size(&self) -> usize {
        self.raw.as_ref().map_or(0, RawBuffer::used_size)
    }

    /// Id of the held raw block.
    pub fn raw_id(&self) -> Option<RawBufferId> {
        self.raw.as_ref().map(RawBuffer::id)
    }

    pub fn pool(&self) -> &RawBufferPool {
        &self.pool
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    pub fn pending_consumers(&self) -> usize {
        self.count_in(ConsumerState::Pending)
    }

    pub fn active_consumers(&self) -> usize {
        self.count_in(ConsumerState::Active)
    }

    pub fn released_consumers(&self) -> usize {
        self.count_in(ConsumerState::Released)
    }

    pub fn consumer(&self, consumer: ConsumerId) -> Option<&ConsumerRecord> {
        self.consumers.get(&consumer)
    }

    pub fn consumer_state(&self, consumer: ConsumerId) -> Option<ConsumerState> {
        self.consumer(consumer).map(ConsumerRecord::state)
    }

    /// Looks up a consumer by its registered name.
    pub fn find_consumer(&self, name: &str) -> Option<ConsumerId> {
        self.consumers
            .values()
            .find(|r| r.name() == name)
            .map(ConsumerRecord::id)
    }

    /// Returns `true` if `consumer` currently holds the block `offset`+`length`.
    pub fn is_active_block(&self, consumer: ConsumerId, offset: usize, length: usize) -> bool {
        self.consumer(consumer)
            .is_some_and(|r| r.holds(SegmentKey { offset, length }))
    }

    // ── Private helpers ───────────────────────────────────────────

    fn count_in(&self, state: ConsumerState) -> usize {
        self.consumers.values().filter(|r| r.state() == state).count()
    }

    fn recycle_raw(&mut self) {
        if let Some(raw) = self.raw.take() {
            let id = raw.id();
            if let Err(e) = self.pool.release(raw) {
                tracing::warn!("'{}' could not return {id} to the pool: {e}", self.name);
            }
        }
    }

    fn not_filling(&self) -> BufferError {
        BufferError::NotFilling {
            buffer: self.name.clone(),
            phase: self.phase,
        }
    }
}

impl Drop for DataBuffer {
    fn drop(&mut self) {
        if self.active_consumers() > 0 {
            tracing::warn!(
                "'{}' dropped with {} active consumers",
                self.name,
                self.active_consumers(),
            );
        }
        self.recycle_raw();
    }
}

impl fmt::Debug for DataBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataBuffer")
            .field("name", &self.name)
            .field("phase", &self.phase)
            .field("raw", &self.raw_id())
            .field("segments", &self.segments.len())
            .field("pending", &self.pending_consumers())
            .field("active", &self.active_consumers())
            .field("released", &self.released_consumers())
            .finish()
    }
}
