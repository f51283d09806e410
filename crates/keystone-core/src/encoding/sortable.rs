//! Sort-order preserving encoding for variable-length byte strings.
//!
//! A raw byte string cannot be followed by more data in a key: `"jack"`
//! followed by a row id starting with `0x7F` would sort after `"jacka"`.
//! The escaped form fixes that by terminating the string with a sequence
//! that is smaller than any continuation.
//!
//! # Encoding
//!
//! - `0x00` in the data is escaped to `0x00 0x01`
//! - The sequence ends with `0x00 0x00` (double null terminator)
//!
//! This preserves lexicographic ordering, `"a" < "a\0" < "aa" < "ab" < "b"`,
//! and the terminator marks where the string ends.
//!
//! # Example
//!
//! ```
//! use keystone_core::encoding::sortable::{decode_escaped, encode_escaped};
//!
//! let mut a = Vec::new();
//! let mut b = Vec::new();
//! encode_escaped(b"jack", &mut a);
//! encode_escaped(b"jackk", &mut b);
//! assert!(a < b);
//!
//! let (decoded, consumed) = decode_escaped(&a).unwrap();
//! assert_eq!(decoded, b"jack");
//! assert_eq!(consumed, a.len());
//! ```

use crate::error::CoreError;

/// Escape byte: when we see 0x00 in data, we output 0x00 0x01
const ESCAPE_BYTE: u8 = 0x01;
/// Terminator: end of string/bytes is marked by 0x00 0x00
const TERMINATOR: u8 = 0x00;

/// Number of bytes `data` occupies once escaped and terminated.
#[must_use]
pub fn escaped_len(data: &[u8]) -> usize {
    data.len() + data.iter().filter(|&&b| b == 0x00).count() + 2
}

/// Append the escaped, terminated form of `data` to `buf`.
pub fn encode_escaped(data: &[u8], buf: &mut Vec<u8>) {
    buf.reserve(escaped_len(data));
    for &byte in data {
        if byte == 0x00 {
            buf.push(0x00);
            buf.push(ESCAPE_BYTE);
        } else {
            buf.push(byte);
        }
    }
    buf.push(TERMINATOR);
    buf.push(TERMINATOR);
}

/// Decode an escaped byte string from the front of `data`.
///
/// Returns the decoded bytes and the number of input bytes consumed,
/// terminator included. Bytes after the terminator are left untouched.
///
/// # Errors
///
/// Returns [`CoreError::Encoding`] if an escape sequence is invalid or the
/// terminator is missing.
pub fn decode_escaped(data: &[u8]) -> Result<(Vec<u8>, usize), CoreError> {
    let mut result = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        if data[i] != 0x00 {
            result.push(data[i]);
            i += 1;
            continue;
        }

        match data.get(i + 1) {
            Some(&TERMINATOR) => return Ok((result, i + 2)),
            Some(&ESCAPE_BYTE) => {
                result.push(0x00);
                i += 2;
            }
            Some(other) => {
                return Err(CoreError::Encoding(format!(
                    "invalid escape sequence: 0x00 0x{other:02x}"
                )));
            }
            None => {
                return Err(CoreError::Encoding("unexpected end of escaped bytes".into()));
            }
        }
    }

    Err(CoreError::Encoding("missing terminator in escaped bytes".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escaped(data: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_escaped(data, &mut buf);
        buf
    }

    #[test]
    fn layout() {
        assert_eq!(escaped(b""), vec![0x00, 0x00]);
        assert_eq!(escaped(b"ab"), vec![b'a', b'b', 0x00, 0x00]);
        assert_eq!(escaped(&[0x00, 0xFF]), vec![0x00, 0x01, 0xFF, 0x00, 0x00]);
    }

    #[test]
    fn escaped_len_matches_output() {
        let cases: [&[u8]; 4] = [b"", b"abc", &[0, 0, 0], &[1, 0, 2, 0]];
        for data in cases {
            assert_eq!(escaped_len(data), escaped(data).len());
        }
    }

    #[test]
    fn sort_order_bytes() {
        let ordered: [&[u8]; 6] = [b"", b"a", b"a\x00", b"a\x00b", b"aa", b"b"];
        for pair in ordered.windows(2) {
            assert!(
                escaped(pair[0]) < escaped(pair[1]),
                "{:?} should sort before {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn order_survives_appended_data() {
        let mut short = escaped(b"jack");
        short.extend_from_slice(&[0xFF; 8]);
        let mut long = escaped(b"jacka");
        long.extend_from_slice(&[0x00; 8]);

        assert!(short < long);
    }

    #[test]
    fn decode_with_trailing_bytes() {
        let mut data = escaped(b"x\x00y");
        let encoded_len = data.len();
        data.extend_from_slice(b"tail");

        let (decoded, consumed) = decode_escaped(&data).expect("decode");
        assert_eq!(decoded, b"x\x00y");
        assert_eq!(consumed, encoded_len);
    }

    #[test]
    fn decode_missing_terminator_fails() {
        assert!(decode_escaped(b"abc").is_err());
        assert!(decode_escaped(b"abc\x00").is_err());
    }

    #[test]
    fn decode_invalid_escape_fails() {
        let err = decode_escaped(&[b'a', 0x00, 0x07]).expect_err("invalid escape");
        assert_eq!(err, CoreError::Encoding("invalid escape sequence: 0x00 0x07".into()));
    }
}
