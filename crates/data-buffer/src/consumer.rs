// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-consumer bookkeeping.
//!
//! Each registered consumer has one [`ConsumerRecord`] for the lifetime of
//! the buffer. Its [`ConsumerState`] tag says which of the three logical
//! lists it belongs to:
//!
//! ```text
//!   Pending ──subscribe──► Active ──last release──► Released
//!      ▲                     │                         │
//!      └──────reset──────────┴──────────reset──────────┘
//! ```
//!
//! `Active → Pending` happens only when a buffer is reset while the
//! consumer still holds blocks, which is a pipeline bug and gets logged.

use crate::{DataType, SegmentKey};
use std::fmt;

/// Handle of a registered consumer, unique within one buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct ConsumerId(pub(crate) u32);

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "consumer#{}", self.0)
    }
}

/// Where a consumer stands in the current fill cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ConsumerState {
    /// Registered, not yet subscribed this cycle.
    Pending,
    /// Holds at least one checked-out block.
    Active,
    /// Subscribed and released everything this cycle.
    Released,
}

impl ConsumerState {
    /// Returns `true` if `self → to` is a legal transition.
    pub fn can_transition(self, to: ConsumerState) -> bool {
        use ConsumerState::*;
        matches!(
            (self, to),
            (Pending, Active) | (Active, Released) | (Released, Pending) | (Active, Pending)
        )
    }
}

impl fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsumerState::Pending => write!(f, "pending"),
            ConsumerState::Active => write!(f, "active"),
            ConsumerState::Released => write!(f, "released"),
        }
    }
}

/// Bookkeeping for one consumer of a [`DataBuffer`](crate::DataBuffer).
#[derive(Debug, Clone)]
pub struct ConsumerRecord {
    id: ConsumerId,
    name: String,
    accepted_types: Vec<DataType>,
    state: ConsumerState,
    /// Checked-out blocks. A multiset: two segments may share a region.
    active_segments: Vec<SegmentKey>,
}

impl ConsumerRecord {
    pub(crate) fn new(id: ConsumerId, name: String, accepted_types: Vec<DataType>) -> Self {
        Self {
            id,
            name,
            accepted_types,
            state: ConsumerState::Pending,
            active_segments: Vec::new(),
        }
    }

    pub fn id(&self) -> ConsumerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn accepted_types(&self) -> &[DataType] {
        &self.accepted_types
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    /// Blocks currently checked out by this consumer.
    pub fn active_segments(&self) -> &[SegmentKey] {
        &self.active_segments
    }

    /// Returns `true` if any accepted type matches `data_type`.
    pub fn accepts(&self, data_type: &DataType) -> bool {
        self.accepted_types.iter().any(|t| t.matches(data_type))
    }

    pub(crate) fn holds(&self, key: SegmentKey) -> bool {
        self.active_segments.contains(&key)
    }

    pub(crate) fn hold(&mut self, key: SegmentKey) {
        self.active_segments.push(key);
    }

    /// Removes one occurrence of `key`. Returns `false` if it was not held.
    pub(crate) fn take(&mut self, key: SegmentKey) -> bool {
        match self.active_segments.iter().position(|k| *k == key) {
            Some(pos) => {
                self.active_segments.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    /// Drops every held block. Returns how many there were.
    pub(crate) fn forget_all(&mut self) -> usize {
        let n = self.active_segments.len();
        self.active_segments.clear();
        n
    }

    /// Guarded state change. On an illegal transition the state is left
    /// untouched and the current state is returned.
    pub(crate) fn transition(&mut self, to: ConsumerState) -> Result<(), ConsumerState> {
        if self.state.can_transition(to) {
            self.state = to;
            Ok(())
        } else {
            Err(self.state)
        }
    }
}
