// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Shared pool of reusable raw memory blocks.
//!
//! The [`RawBufferPool`] keeps two lists:
//!
//! 1. **free**: blocks not in use. The pool owns their storage.
//! 2. **active**: blocks lent out as a [`RawBuffer`]. The pool only keeps
//!    their bookkeeping; the storage travels with the buffer.
//!
//! An acquisition takes the first free block whose capacity covers the
//! request with less than `margin` bytes of slack. Otherwise a fresh block
//! of exactly the requested size is allocated. Blocks are never resized:
//! a block's capacity is fixed when it is created.
//!
//! # Thread Safety
//! `RawBufferPool` is a cheap `Clone` handle around an `Arc`. Both lists sit
//! behind a single `Mutex`, so pipelines running on different threads may
//! share one pool.
//!
//! # Teardown
//! Free storage is deallocated by [`RawBufferPool::teardown`] or, at the
//! latest, when the last handle is dropped. Blocks still active at that
//! point are reported as leaks.

use crate::{PoolError, PoolStats, RawBuffer, RawBufferId, ReuseMargin};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct FreeBlock {
    id: RawBufferId,
    data: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
struct ActiveBlock {
    id: RawBufferId,
    capacity: usize,
    used_size: usize,
}

#[derive(Default)]
struct PoolState {
    free: Vec<FreeBlock>,
    active: Vec<ActiveBlock>,
    stats: PoolStats,
}

impl PoolState {
    fn active_bytes(&self) -> usize {
        self.active.iter().map(|b| b.capacity).sum()
    }

    fn teardown(&mut self) -> TeardownReport {
        let freed_blocks = self.free.len();
        let freed_bytes: usize = self.free.iter().map(|b| b.data.len()).sum();
        self.free.clear();
        self.free.shrink_to_fit();

        let leaked: Vec<RawBufferId> = self.active.drain(..).map(|b| b.id).collect();
        for id in &leaked {
            tracing::warn!("raw buffer {id} still active at pool teardown");
        }

        if freed_blocks > 0 || !leaked.is_empty() {
            tracing::debug!(
                "pool teardown: {freed_blocks} blocks ({freed_bytes} bytes) freed, {} leaked",
                leaked.len(),
            );
        }

        TeardownReport {
            freed_blocks,
            freed_bytes,
            leaked,
        }
    }
}

struct PoolInner {
    margin: ReuseMargin,
    state: Mutex<PoolState>,
}

impl Drop for PoolInner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        state.teardown();
    }
}

/// Outcome of a pool teardown.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct TeardownReport {
    /// Number of free blocks deallocated.
    pub freed_blocks: usize,
    /// Total capacity of the deallocated blocks.
    pub freed_bytes: usize,
    /// Blocks that were still lent out.
    pub leaked: Vec<RawBufferId>,
}

impl TeardownReport {
    /// Returns `true` if no block was still active.
    pub fn is_clean(&self) -> bool {
        self.leaked.is_empty()
    }
}

/// The process-wide pool of raw buffers.
///
/// # Example
/// ```
/// use buffer_pool::{RawBufferPool, ReuseMargin};
///
/// let pool = RawBufferPool::new(ReuseMargin::from_bytes(64));
///
/// let raw = pool.acquire(1000);
/// let first = raw.id();
/// pool.release(raw).unwrap();
///
/// // 10 bytes of slack is inside the margin: same block comes back.
/// let raw = pool.acquire(990);
/// assert_eq!(raw.id(), first);
/// assert_eq!(raw.capacity(), 1000);
/// # pool.release(raw).unwrap();
/// ```
#[derive(Clone)]
pub struct RawBufferPool {
    inner: Arc<PoolInner>,
}

impl RawBufferPool {
    /// Creates an empty pool with the given reuse margin.
    pub fn new(margin: ReuseMargin) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                margin,
                state: Mutex::new(PoolState::default()),
            }),
        }
    }

    /// Returns the pool's default reuse margin.
    pub fn margin(&self) -> ReuseMargin {
        self.inner.margin
    }

    /// Acquires a block of at least `min_size` bytes using the pool margin.
    pub fn acquire(&self, min_size: usize) -> RawBuffer {
        self.acquire_with_margin(min_size, self.inner.margin)
    }

    /// Acquires a block of at least `min_size` bytes.
    ///
    /// Reuses the first free block whose capacity is at least `min_size`
    /// with less than `margin` bytes to spare, otherwise allocates a new
    /// block of exactly `min_size` bytes. Never fails: running out of
    /// memory is fatal to the process, not a pool condition.
    pub fn acquire_with_margin(&self, min_size: usize, margin: ReuseMargin) -> RawBuffer {
        let mut state = self.lock();

        let reusable = state
            .free
            .iter()
            .position(|b| margin.admits(b.data.len(), min_size));

        let (id, data) = match reusable {
            Some(pos) => {
                let block = state.free.remove(pos);
                state.stats.record_reuse(min_size);
                tracing::debug!(
                    "reusing {} (capacity {}) for {min_size} bytes",
                    block.id,
                    block.data.len(),
                );
                (block.id, block.data)
            }
            None => {
                let id = RawBufferId::next();
                state.stats.record_fresh(min_size);
                tracing::debug!("allocating {id} with {min_size} bytes");
                (id, vec![0u8; min_size])
            }
        };

        state.active.push(ActiveBlock {
            id,
            capacity: data.len(),
            used_size: min_size,
        });
        let (blocks, bytes) = (state.active.len(), state.active_bytes());
        state.stats.update_peak(blocks, bytes);

        RawBuffer::new(id, data, min_size)
    }

    /// Returns a block to the free list.
    ///
    /// Fails with [`PoolError::NotFound`] if the block is not in this pool's
    /// active set. The rejected buffer's storage is dropped rather than
    /// adopted, so a foreign or stale buffer can never corrupt the lists.
    pub fn release(&self, raw: RawBuffer) -> Result<(), PoolError> {
        let mut state = self.lock();

        let Some(pos) = state.active.iter().position(|b| b.id == raw.id()) else {
            state.stats.record_rejected_release();
            tracing::warn!("release of {} rejected: not an active block", raw.id());
            return Err(PoolError::NotFound { id: raw.id() });
        };

        state.active.remove(pos);
        let (id, data) = raw.into_storage();
        state.free.push(FreeBlock { id, data });
        state.stats.record_release();
        Ok(())
    }

    /// Deallocates every free block and forgets every active block.
    ///
    /// Active blocks are reported as leaks in the returned report; their
    /// storage belongs to whoever holds the [`RawBuffer`], and a later
    /// release of such a buffer fails with [`PoolError::NotFound`]. The
    /// pool remains usable afterwards and starts again from empty lists.
    pub fn teardown(&self) -> TeardownReport {
        self.lock().teardown()
    }

    /// Returns the number of blocks in the free list.
    pub fn free_blocks(&self) -> usize {
        self.lock().free.len()
    }

    /// Returns the number of blocks currently lent out.
    pub fn active_blocks(&self) -> usize {
        self.lock().active.len()
    }

    /// Returns the total capacity held in the free list.
    pub fn free_bytes(&self) -> usize {
        self.lock().free.iter().map(|b| b.data.len()).sum()
    }

    /// Returns the total capacity of the blocks currently lent out.
    pub fn active_bytes(&self) -> usize {
        self.lock().active_bytes()
    }

    /// Returns the requested size of an active block, if it is active.
    pub fn used_size_of(&self, id: RawBufferId) -> Option<usize> {
        self.lock()
            .active
            .iter()
            .find(|b| b.id == id)
            .map(|b| b.used_size)
    }

    /// Returns `true` if `id` is in the free list.
    pub fn is_free(&self, id: RawBufferId) -> bool {
        self.lock().free.iter().any(|b| b.id == id)
    }

    /// Returns `true` if `id` is in the active list.
    pub fn is_active(&self, id: RawBufferId) -> bool {
        self.lock().active.iter().any(|b| b.id == id)
    }

    /// Returns a snapshot of the pool statistics.
    pub fn stats(&self) -> PoolStats {
        self.lock().stats.clone()
    }

    /// Returns the number of handles sharing this pool.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RawBufferPool {
    fn default() -> Self {
        Self::new(ReuseMargin::DEFAULT)
    }
}

impl std::fmt::Debug for RawBufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("RawBufferPool")
            .field("margin", &self.inner.margin)
            .field("free_blocks", &state.free.len())
            .field("active_blocks", &state.active.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(margin: usize) -> RawBufferPool {
        RawBufferPool::new(ReuseMargin::from_bytes(margin))
    }

    #[test]
    fn test_acquire_fresh() {
        let pool = pool(64);
        let raw = pool.acquire(1000);
        assert_eq!(raw.used_size(), 1000);
        assert_eq!(raw.capacity(), 1000);
        assert!(pool.is_active(raw.id()));
        assert_eq!(pool.free_blocks(), 0);
        assert_eq!(pool.used_size_of(raw.id()), Some(1000));
        pool.release(raw).unwrap();
    }

    #[test]
    fn test_margin_scenario() {
        let pool = pool(64);

        let raw = pool.acquire(1000);
        let original = raw.id();
        pool.release(raw).unwrap();
        assert!(pool.is_free(original));

        // Existing capacity 1000 < 1040: a new block is needed.
        let bigger = pool.acquire(1040);
        assert_ne!(bigger.id(), original);
        assert_eq!(bigger.capacity(), 1040);
        assert!(pool.is_free(original));

        // 1000 - 990 = 10 < 64: reuse.
        let smaller = pool.acquire(990);
        assert_eq!(smaller.id(), original);
        assert_eq!(smaller.used_size(), 990);
        assert_eq!(smaller.capacity(), 1000);
        assert_eq!(smaller.as_slice().len(), 990);

        let stats = pool.stats();
        assert_eq!(stats.fresh_allocations, 2);
        assert_eq!(stats.reuses, 1);

        pool.release(bigger).unwrap();
        pool.release(smaller).unwrap();
    }

    #[test]
    fn test_slack_outside_margin_allocates() {
        let pool = pool(64);
        let raw = pool.acquire(1000);
        let original = raw.id();
        pool.release(raw).unwrap();

        let small = pool.acquire(500);
        assert_ne!(small.id(), original);
        pool.release(small).unwrap();
        assert_eq!(pool.free_blocks(), 2);
    }

    #[test]
    fn test_first_fit_in_free_order() {
        let pool = pool(1024);
        let a = pool.acquire(1000);
        let b = pool.acquire(1010);
        let (a_id, b_id) = (a.id(), b.id());
        pool.release(b).unwrap();
        pool.release(a).unwrap();

        // Both fit; the first released block comes back first.
        let first = pool.acquire(900);
        assert_eq!(first.id(), b_id);
        let second = pool.acquire(900);
        assert_eq!(second.id(), a_id);
        pool.release(first).unwrap();
        pool.release(second).unwrap();
    }

    #[test]
    fn test_reused_contents_not_zeroed() {
        let pool = pool(64);
        let mut raw = pool.acquire(16);
        raw.as_mut_slice().fill(0xAB);
        pool.release(raw).unwrap();

        let raw = pool.acquire(16);
        assert!(raw.as_slice().iter().all(|&b| b == 0xAB));
        pool.release(raw).unwrap();
    }

    #[test]
    fn test_release_foreign_buffer() {
        let pool_a = pool(64);
        let pool_b = pool(64);

        let raw = pool_a.acquire(128);
        let id = raw.id();
        let err = pool_b.release(raw).unwrap_err();
        assert!(matches!(err, PoolError::NotFound { id: e } if e == id));

        assert_eq!(pool_b.free_blocks(), 0);
        assert_eq!(pool_b.stats().rejected_releases, 1);
        // The lender still lists it: the storage is gone, so it leaks.
        assert!(pool_a.is_active(id));
        assert_eq!(pool_a.teardown().leaked, vec![id]);
    }

    #[test]
    fn test_teardown_reports_leaks() {
        let pool = pool(64);
        let kept = pool.acquire(100);
        let returned = pool.acquire(200);
        pool.release(returned).unwrap();

        let report = pool.teardown();
        assert_eq!(report.freed_blocks, 1);
        assert_eq!(report.freed_bytes, 200);
        assert_eq!(report.leaked, vec![kept.id()]);
        assert!(!report.is_clean());
        assert_eq!(pool.free_blocks(), 0);
        assert_eq!(pool.active_blocks(), 0);

        // The leaked block is no longer known.
        assert!(pool.release(kept).is_err());
    }

    #[test]
    fn test_teardown_clean() {
        let pool = pool(64);
        let raw = pool.acquire(10);
        pool.release(raw).unwrap();
        let report = pool.teardown();
        assert!(report.is_clean());
        assert_eq!(pool.teardown(), TeardownReport::default());
    }

    #[test]
    fn test_shared_handles() {
        let pool = pool(64);
        let other = pool.clone();
        assert_eq!(pool.handle_count(), 2);

        let raw = other.acquire(64);
        let id = raw.id();
        pool.release(raw).unwrap();
        assert!(other.is_free(id));

        drop(other);
        assert_eq!(pool.handle_count(), 1);
    }

    #[test]
    fn test_last_handle_dropped_with_block_out() {
        let pool = pool(64);
        let mut raw = pool.acquire(128);
        let other = pool.clone();
        drop(pool);
        drop(other);

        // The block's storage outlives the pool and is freed on its own.
        raw.as_mut_slice().fill(7);
        assert_eq!(raw.used_size(), 128);
        drop(raw);
    }

    #[test]
    fn test_last_handle_dropped_with_free_blocks() {
        let pool = pool(64);
        let a = pool.acquire(32);
        let b = pool.acquire(64);
        pool.release(a).unwrap();
        pool.release(b).unwrap();
        assert_eq!(pool.free_blocks(), 2);
        drop(pool);
    }

    #[test]
    fn test_byte_accounting() {
        let pool = pool(64);
        let a = pool.acquire(100);
        let b = pool.acquire(300);
        assert_eq!(pool.active_bytes(), 400);
        pool.release(a).unwrap();
        assert_eq!(pool.active_bytes(), 300);
        assert_eq!(pool.free_bytes(), 100);
        pool.release(b).unwrap();

        let stats = pool.stats();
        assert_eq!(stats.peak_active_blocks, 2);
        assert_eq!(stats.peak_active_bytes, 400);
        assert_eq!(stats.releases, 2);
    }

    #[test]
    fn test_zero_sized_block() {
        let pool = pool(64);
        let raw = pool.acquire(0);
        assert_eq!(raw.capacity(), 0);
        assert!(raw.as_slice().is_empty());
        pool.release(raw).unwrap();
    }

    #[test]
    fn test_debug_format() {
        let pool = pool(64);
        let debug = format!("{pool:?}");
        assert!(debug.contains("RawBufferPool"));
        assert!(debug.contains("margin"));
    }
}
