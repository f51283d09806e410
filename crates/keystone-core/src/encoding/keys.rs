//! Composite keys for secondary indexes.
//!
//! An index entry is stored entirely in its key:
//!
//! ```text
//! [escaped_value][0x00 0x00][row_id: u64 big-endian]
//! ```
//!
//! - `escaped_value`: the indexed value with `0x00` bytes escaped, see
//!   [`sortable`](super::sortable)
//! - `row_id`: the row holding the value, fixed width so it never changes
//!   the relative order of two values
//!
//! Entries therefore sort by value first and by row id second, and all row
//! ids of one value form a contiguous ascending run that starts at
//! [`encode_index_value_prefix`].

use super::sortable::{decode_escaped, encode_escaped, escaped_len};
use crate::error::CoreError;
use crate::types::RowId;

/// Encode an index entry key.
///
/// # Example
///
/// ```
/// use keystone_core::encoding::keys::encode_index_key;
/// use keystone_core::RowId;
///
/// let first = encode_index_key(b"jack", RowId::new(1));
/// let second = encode_index_key(b"jack", RowId::new(2));
/// let other = encode_index_key(b"john", RowId::new(0));
///
/// assert!(first < second);
/// assert!(second < other);
/// ```
#[must_use]
pub fn encode_index_key(value: &[u8], row_id: RowId) -> Vec<u8> {
    let mut key = encode_index_value_prefix(value);
    key.extend_from_slice(&row_id.to_bytes());
    key
}

/// Encode the prefix shared by every entry of `value`.
///
/// It sorts before all of those entries and after every entry of a smaller
/// value, which makes it the seek target for ceiling lookups.
#[must_use]
pub fn encode_index_value_prefix(value: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(escaped_len(value) + RowId::ENCODED_LEN);
    encode_escaped(value, &mut key);
    key
}

/// Decode an index entry key into its value and row id.
///
/// # Errors
///
/// Returns [`CoreError::Encoding`] if the key is not a well-formed index key.
pub fn decode_index_key(key: &[u8]) -> Result<(Vec<u8>, RowId), CoreError> {
    if key.len() < 2 + RowId::ENCODED_LEN {
        return Err(CoreError::malformed("index key", key));
    }
    let split = key.len() - RowId::ENCODED_LEN;

    let (value, consumed) = decode_escaped(&key[..split])?;
    if consumed != split {
        return Err(CoreError::malformed("index key", key));
    }
    let row_id = RowId::from_bytes(&key[split..])
        .ok_or_else(|| CoreError::malformed("index key", key))?;

    Ok((value, row_id))
}

/// The smallest key that sorts strictly after `key`.
#[must_use]
pub fn successor(key: &[u8]) -> Vec<u8> {
    let mut next = Vec::with_capacity(key.len() + 1);
    next.extend_from_slice(key);
    next.push(0x00);
    next
}
