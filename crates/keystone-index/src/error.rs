//! Index error types.

use keystone_core::CoreError;
use keystone_storage::StorageError;
use thiserror::Error;

/// Result type for index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors that can occur in index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The backing store failed or refused the operation.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A stored index key could not be decoded.
    #[error(transparent)]
    Encoding(#[from] CoreError),
}

impl IndexError {
    /// Returns `true` if the (value, row id) pairing was not in the index.
    #[must_use]
    pub const fn is_key_not_found(&self) -> bool {
        matches!(self, Self::Storage(StorageError::KeyNotFound))
    }

    /// Returns `true` if the operation was refused because the transaction is read-only.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        matches!(self, Self::Storage(StorageError::TransactionReadOnly))
    }
}
