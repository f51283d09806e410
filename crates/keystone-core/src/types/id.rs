//! Row identifier type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a row in a table, as referenced by index entries.
///
/// Row ids are encoded as 8 big-endian bytes so that byte order and numeric
/// order agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(u64);

impl RowId {
    /// Width of the encoded form in bytes.
    pub const ENCODED_LEN: usize = 8;

    /// Create a new `RowId` from a raw u64 value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw u64 value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Encode as fixed-width big-endian bytes.
    #[inline]
    #[must_use]
    pub const fn to_bytes(self) -> [u8; Self::ENCODED_LEN] {
        self.0.to_be_bytes()
    }

    /// Decode from exactly [`RowId::ENCODED_LEN`] big-endian bytes.
    ///
    /// Returns `None` if `bytes` has the wrong length.
    #[inline]
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; Self::ENCODED_LEN] = bytes.try_into().ok()?;
        Some(Self(u64::from_be_bytes(raw)))
    }
}

impl From<u64> for RowId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
