// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pool statistics for profiling and diagnostics.
//!
//! [`PoolStats`] tracks how well block reuse is working: a healthy chain
//! settles into a steady state where nearly every acquisition is a reuse.
//! A low reuse ratio usually means the margin is too small for the
//! event-size jitter.

/// Cumulative statistics about raw buffer pool usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct PoolStats {
    /// Total number of acquisitions.
    pub acquisitions: u64,
    /// Acquisitions served by reusing a free block.
    pub reuses: u64,
    /// Acquisitions that required a fresh block.
    pub fresh_allocations: u64,
    /// Blocks handed back to the free list.
    pub releases: u64,
    /// Release attempts rejected because the block was not active.
    pub rejected_releases: u64,
    /// High-water mark of simultaneously active blocks.
    pub peak_active_blocks: usize,
    /// High-water mark of bytes held by active blocks (capacity).
    pub peak_active_bytes: usize,
    /// Sum of all requested sizes.
    pub cumulative_requested_bytes: u64,
}

impl PoolStats {
    /// Returns the reuse ratio as a fraction in `[0.0, 1.0]`.
    ///
    /// Returns `0.0` if nothing has been acquired yet.
    pub fn reuse_ratio(&self) -> f64 {
        if self.acquisitions == 0 {
            return 0.0;
        }
        self.reuses as f64 / self.acquisitions as f64
    }

    pub(crate) fn record_reuse(&mut self, size: usize) {
        self.acquisitions += 1;
        self.reuses += 1;
        self.cumulative_requested_bytes += size as u64;
    }

    pub(crate) fn record_fresh(&mut self, size: usize) {
        self.acquisitions += 1;
        self.fresh_allocations += 1;
        self.cumulative_requested_bytes += size as u64;
    }

    pub(crate) fn record_release(&mut self) {
        self.releases += 1;
    }

    pub(crate) fn record_rejected_release(&mut self) {
        self.rejected_releases += 1;
    }

    /// Updates the high-water marks if needed.
    pub(crate) fn update_peak(&mut self, active_blocks: usize, active_bytes: usize) {
        self.peak_active_blocks = self.peak_active_blocks.max(active_blocks);
        self.peak_active_bytes = self.peak_active_bytes.max(active_bytes);
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        let peak_kb = self.peak_active_bytes as f64 / 1024.0;
        format!(
            "Acquisitions: {} total ({} reused, {} fresh, {:.0}% reuse), \
             {} releases ({} rejected), peak {} blocks / {:.1} KiB",
            self.acquisitions,
            self.reuses,
            self.fresh_allocations,
            self.reuse_ratio() * 100.0,
            self.releases,
            self.rejected_releases,
            self.peak_active_blocks,
            peak_kb,
        )
    }
}
