// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Segment and block descriptors.

use crate::DataType;
use std::fmt;

/// Key under which a consumer holds a checked-out segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct SegmentKey {
    pub offset: usize,
    pub length: usize,
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..+{}]", self.offset, self.length)
    }
}

/// One typed region of a filled raw buffer, as declared by the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DataSegment {
    /// Byte offset from the start of the buffer.
    pub offset: usize,
    /// Length in bytes.
    pub length: usize,
    /// Content type.
    pub data_type: DataType,
    /// Free-form specification word (e.g. a readout partition number).
    pub specification: u32,
}

impl DataSegment {
    pub fn new(offset: usize, length: usize, data_type: DataType, specification: u32) -> Self {
        Self {
            offset,
            length,
            data_type,
            specification,
        }
    }

    /// End offset, or `None` if `offset + length` overflows.
    pub fn end(&self) -> Option<usize> {
        self.offset.checked_add(self.length)
    }

    /// Returns `true` if the segment lies within the first `used_size` bytes.
    pub fn fits_in(&self, used_size: usize) -> bool {
        self.end().is_some_and(|end| end <= used_size)
    }

    pub fn key(&self) -> SegmentKey {
        SegmentKey {
            offset: self.offset,
            length: self.length,
        }
    }
}

/// A segment handed to a consumer by a subscription.
///
/// Read the bytes with [`DataBuffer::block_data`](crate::DataBuffer::block_data)
/// and give the block back with
/// [`DataBuffer::release_block`](crate::DataBuffer::release_block).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct BlockDescriptor {
    pub offset: usize,
    pub length: usize,
    pub data_type: DataType,
    pub specification: u32,
}

impl BlockDescriptor {
    pub fn key(&self) -> SegmentKey {
        SegmentKey {
            offset: self.offset,
            length: self.length,
        }
    }
}

impl From<&DataSegment> for BlockDescriptor {
    fn from(segment: &DataSegment) -> Self {
        Self {
            offset: segment.offset,
            length: segment.length,
            data_type: segment.data_type,
            specification: segment.specification,
        }
    }
}

/// Result of a successful subscription.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Subscription {
    /// Matching blocks in declaration order, at most `capacity` of them.
    pub blocks: Vec<BlockDescriptor>,
    /// Number of segments that matched, regardless of capacity.
    pub total_matches: usize,
}

impl Subscription {
    /// Returns `true` if some matches did not fit into the requested capacity.
    pub fn is_truncated(&self) -> bool {
        self.total_matches > self.blocks.len()
    }
}
