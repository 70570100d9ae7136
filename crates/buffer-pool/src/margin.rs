// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reuse margin configuration and parsing.
//!
//! A [`ReuseMargin`] bounds how much slack a free block may carry and still
//! be handed out for a smaller request. Event sizes jitter by a few bytes
//! from one event to the next; a small margin lets those requests land on
//! the same block instead of allocating a fresh one each time.

use crate::PoolError;
use std::fmt;

/// Maximum tolerated slack (`capacity - requested`) when reusing a block.
///
/// The comparison is strict: a block is reused only when its slack is
/// *less than* the margin, so a margin of zero disables reuse.
///
/// # Parsing
/// - `"64"` or `"64B"` → 64 bytes
/// - `"1K"`, `"1KB"`, `"1KiB"` → 1024 bytes
/// - `"2M"`, `"2MB"`, `"2MiB"` → 2 × 1024² bytes
///
/// # Examples
/// ```
/// use buffer_pool::ReuseMargin;
///
/// assert_eq!(ReuseMargin::default().as_bytes(), 1024);
/// assert_eq!(ReuseMargin::parse("4K").unwrap().as_bytes(), 4096);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct ReuseMargin {
    bytes: usize,
}

impl ReuseMargin {
    /// The default margin: 1 KiB.
    pub const DEFAULT: Self = Self { bytes: 1024 };

    /// Creates a margin from a byte count.
    pub const fn from_bytes(bytes: usize) -> Self {
        Self { bytes }
    }

    /// Creates a margin from kibibytes.
    pub const fn from_kb(kb: usize) -> Self {
        Self { bytes: kb * 1024 }
    }

    /// Returns the margin in bytes.
    pub fn as_bytes(&self) -> usize {
        self.bytes
    }

    /// Returns `true` if a block of `capacity` bytes may serve a request
    /// for `requested` bytes.
    pub fn admits(&self, capacity: usize, requested: usize) -> bool {
        capacity >= requested && capacity - requested < self.bytes
    }

    /// Parses a human-readable size string. Case-insensitive.
    pub fn parse(s: &str) -> Result<Self, PoolError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PoolError::InvalidSize("empty size string".into()));
        }

        let upper = s.to_ascii_uppercase();
        let (num_str, multiplier) = [
            ("MIB", 1024 * 1024),
            ("MB", 1024 * 1024),
            ("M", 1024 * 1024),
            ("KIB", 1024),
            ("KB", 1024),
            ("K", 1024),
            ("B", 1),
        ]
        .iter()
        .find(|(suffix, _)| upper.ends_with(suffix))
        .map(|&(suffix, mult)| (&s[..s.len() - suffix.len()], mult))
        .unwrap_or((s, 1));

        let value: usize = num_str.trim().parse().map_err(|_| {
            PoolError::InvalidSize(format!(
                "'{s}': expected a number followed by an optional suffix (B, K, M)"
            ))
        })?;

        let bytes = value
            .checked_mul(multiplier)
            .ok_or_else(|| PoolError::InvalidSize(format!("'{s}' overflows usize")))?;

        Ok(Self { bytes })
    }
}

impl Default for ReuseMargin {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for ReuseMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bytes >= 1024 * 1024 && self.bytes % (1024 * 1024) == 0 {
            write!(f, "{} MiB", self.bytes / (1024 * 1024))
        } else if self.bytes >= 1024 && self.bytes % 1024 == 0 {
            write!(f, "{} KiB", self.bytes / 1024)
        } else {
            write!(f, "{} B", self.bytes)
        }
    }
}
