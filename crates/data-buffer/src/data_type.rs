// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Content-type tags for buffer segments.
//!
//! A [`DataType`] is an 8-byte identifier plus a 4-byte origin, both
//! space-padded ASCII (`"CLUSTERS"`, `"TPC "`). Either field may be the
//! wildcard, so a consumer can ask for "clusters from any detector" or
//! "anything from the TPC".

use crate::BufferError;
use std::fmt;
use std::str::FromStr;

/// Length of the identifier field in bytes.
pub const ID_LEN: usize = 8;
/// Length of the origin field in bytes.
pub const ORIGIN_LEN: usize = 4;

/// Type tag of a data segment.
///
/// # Examples
/// ```
/// use data_buffer::DataType;
///
/// let clusters: DataType = "CLUSTERS:TPC".parse().unwrap();
/// let any_clusters = DataType::new("CLUSTERS", "****").unwrap();
///
/// assert!(any_clusters.matches(&clusters));
/// assert!(DataType::ANY.matches(&clusters));
/// assert_eq!(clusters.to_string(), "CLUSTERS:TPC");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataType {
    id: [u8; ID_LEN],
    origin: [u8; ORIGIN_LEN],
}

impl DataType {
    /// Identifier wildcard.
    pub const ANY_ID: [u8; ID_LEN] = *b"********";
    /// Origin wildcard.
    pub const ANY_ORIGIN: [u8; ORIGIN_LEN] = *b"****";
    /// Matches every type.
    pub const ANY: Self = Self::from_bytes(Self::ANY_ID, Self::ANY_ORIGIN);

    /// Creates a type from raw field bytes.
    pub const fn from_bytes(id: [u8; ID_LEN], origin: [u8; ORIGIN_LEN]) -> Self {
        Self { id, origin }
    }

    /// Creates a type from ASCII strings, space-padding short fields.
    ///
    /// Fails if a field is blank, too long, contains `':'`, or is not
    /// printable ASCII.
    pub fn new(id: &str, origin: &str) -> Result<Self, BufferError> {
        Ok(Self {
            id: pad_field::<ID_LEN>(id)?,
            origin: pad_field::<ORIGIN_LEN>(origin)?,
        })
    }

    /// Returns the same identifier with a different origin.
    pub fn with_origin(self, origin: &str) -> Result<Self, BufferError> {
        Ok(Self {
            origin: pad_field::<ORIGIN_LEN>(origin)?,
            ..self
        })
    }

    /// Returns the raw identifier bytes.
    pub fn id(&self) -> &[u8; ID_LEN] {
        &self.id
    }

    /// Returns the raw origin bytes.
    pub fn origin(&self) -> &[u8; ORIGIN_LEN] {
        &self.origin
    }

    /// Returns `true` if the identifier is the wildcard.
    pub fn is_any_id(&self) -> bool {
        self.id == Self::ANY_ID
    }

    /// Returns `true` if the origin is the wildcard.
    pub fn is_any_origin(&self) -> bool {
        self.origin == Self::ANY_ORIGIN
    }

    /// Wildcard-aware comparison. Symmetric.
    pub fn matches(&self, other: &Self) -> bool {
        let id = self.is_any_id() || other.is_any_id() || self.id == other.id;
        let origin =
            self.is_any_origin() || other.is_any_origin() || self.origin == other.origin;
        id && origin
    }
}

fn pad_field<const N: usize>(s: &str) -> Result<[u8; N], BufferError> {
    // Blank fields and ':' would not survive Display → FromStr.
    let printable = s.bytes().all(|b| (b.is_ascii_graphic() && b != b':') || b == b' ');
    if s.trim().is_empty() || s.len() > N || !printable {
        return Err(BufferError::InvalidDataType(format!(
            "'{s}': expected 1 to {N} printable ASCII characters, not blank and without ':'"
        )));
    }
    let mut field = [b' '; N];
    field[..s.len()].copy_from_slice(s.as_bytes());
    Ok(field)
}

fn trimmed(field: &[u8]) -> String {
    String::from_utf8_lossy(field).trim_end().to_string()
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", trimmed(&self.id), trimmed(&self.origin))
    }
}

impl fmt::Debug for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataType({self})")
    }
}

/// Parses `"ID:ORIGIN"`. A bare `"ID"` gets the origin wildcard.
impl FromStr for DataType {
    type Err = BufferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((id, origin)) => Self::new(id, origin),
            None => Self::new(s, "****"),
        }
    }
}

impl serde::Serialize for DataType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for DataType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
