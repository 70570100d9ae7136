// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the raw buffer pool.

use crate::RawBufferId;

/// Errors that can occur while managing raw buffers.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// A buffer was handed back that the pool does not list as active.
    ///
    /// This is a caller bug (double release, or a buffer from another pool).
    #[error("raw buffer {id} not found in the active set")]
    NotFound { id: RawBufferId },

    /// A byte-size string could not be parsed.
    #[error("invalid size: {0}")]
    InvalidSize(String),
}
