// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Raw buffers lent out by the pool.
//!
//! A [`RawBuffer`] carries the byte storage of one pool block while the
//! block is active. The storage is moved out of the pool on acquire and
//! moved back on release, so at any time exactly one party owns it and no
//! bytes are ever copied between the two.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a pool block.
///
/// Ids are unique across every pool in the process, so a buffer handed to
/// the wrong pool can never be mistaken for one of its own blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct RawBufferId(u64);

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

impl RawBufferId {
    pub(crate) fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the numeric value of the id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RawBufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "raw#{}", self.0)
    }
}

/// A block of byte storage checked out of a [`RawBufferPool`](crate::RawBufferPool).
///
/// The first [`used_size`](Self::used_size) bytes are writable. Contents of a
/// reused block are whatever the previous user left behind; they are not
/// zeroed.
///
/// Hand the buffer back with [`RawBufferPool::release`](crate::RawBufferPool::release).
/// Dropping it instead frees the storage, and the pool reports the block as
/// leaked at teardown.
pub struct RawBuffer {
    id: RawBufferId,
    /// Full block storage; its length is the block capacity.
    data: Vec<u8>,
    used_size: usize,
}

impl RawBuffer {
    /// Wraps pool storage (called internally by the pool).
    pub(crate) fn new(id: RawBufferId, data: Vec<u8>, used_size: usize) -> Self {
        debug_assert!(used_size <= data.len());
        Self {
            id,
            data,
            used_size,
        }
    }

    /// Returns the block identity.
    pub fn id(&self) -> RawBufferId {
        self.id
    }

    /// Returns the number of bytes requested for the current use.
    pub fn used_size(&self) -> usize {
        self.used_size
    }

    /// Returns the total capacity of the block.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Returns an immutable view of the used region.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.used_size]
    }

    /// Returns a mutable view of the used region.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data[..self.used_size]
    }

    /// Gives the storage back to the pool.
    pub(crate) fn into_storage(self) -> (RawBufferId, Vec<u8>) {
        (self.id, self.data)
    }
}

impl fmt::Debug for RawBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawBuffer")
            .field("id", &self.id)
            .field("used_size", &self.used_size)
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = RawBufferId::next();
        let b = RawBufferId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_used_region() {
        let mut raw = RawBuffer::new(RawBufferId::next(), vec![0u8; 32], 8);
        assert_eq!(raw.capacity(), 32);
        assert_eq!(raw.as_slice().len(), 8);

        raw.as_mut_slice().fill(7);
        assert!(raw.as_slice().iter().all(|&b| b == 7));

        let (_, storage) = raw.into_storage();
        assert_eq!(&storage[..8], &[7; 8]);
        assert!(storage[8..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_display_and_debug() {
        let id = RawBufferId(12);
        assert_eq!(id.to_string(), "raw#12");

        let raw = RawBuffer::new(id, vec![0u8; 4], 4);
        let debug = format!("{raw:?}");
        assert!(debug.contains("RawBuffer"));
        assert!(debug.contains("capacity"));
    }
}
