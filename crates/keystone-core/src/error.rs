//! Error types for the core crate.

use thiserror::Error;

/// Maximum number of bytes shown when an error quotes encoded input.
const MAX_BYTES_DISPLAY_LEN: usize = 32;

/// Errors that can occur in the core crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Encoded bytes could not be decoded.
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl CoreError {
    /// Creates an encoding error that quotes the offending bytes.
    ///
    /// Input longer than 32 bytes is truncated in the message.
    #[must_use]
    pub fn malformed(what: &str, bytes: &[u8]) -> Self {
        let shown = &bytes[..bytes.len().min(MAX_BYTES_DISPLAY_LEN)];
        let ellipsis = if bytes.len() > MAX_BYTES_DISPLAY_LEN { "..." } else { "" };
        Self::Encoding(format!("malformed {what}: {shown:02x?}{ellipsis}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_truncates_long_input() {
        let err = CoreError::malformed("index key", &[0xAB; 64]);
        let message = err.to_string();

        assert!(message.starts_with("encoding error: malformed index key"));
        assert!(message.ends_with("..."));
    }

    #[test]
    fn malformed_keeps_short_input() {
        let err = CoreError::malformed("index key", &[0x01, 0x02]);
        assert_eq!(err.to_string(), "encoding error: malformed index key: [01, 02]");
    }
}
