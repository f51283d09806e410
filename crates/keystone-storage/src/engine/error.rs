//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
///
/// The first four variants are the contract every backend shares; callers
/// match on them to tell expected outcomes apart. The rest describe engine
/// lifecycle and backend failures.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A write was attempted through a read-only transaction.
    #[error("transaction is read-only")]
    TransactionReadOnly,

    /// The named store does not exist.
    #[error("store not found: {0}")]
    StoreNotFound(String),

    /// A store with this name already exists.
    #[error("store already exists: {0}")]
    StoreAlreadyExists(String),

    /// The key does not exist in the store.
    #[error("key not found")]
    KeyNotFound,

    /// Keys must contain at least one byte.
    #[error("key must not be empty")]
    EmptyKey,

    /// Store names must contain at least one character.
    #[error("invalid store name: {0:?}")]
    InvalidStoreName(String),

    /// Another writable transaction is active and the writer policy refused to wait.
    #[error("another writable transaction is active")]
    WriterActive,

    /// The engine has been closed.
    #[error("engine is closed")]
    Closed,

    /// The engine cannot close while transactions are still alive.
    #[error("cannot close engine: {0} transaction(s) still active")]
    TransactionsActive(usize),

    /// An internal lock was poisoned (a thread panicked while holding it).
    #[error("internal lock poisoned: {0}")]
    LockPoisoned(String),

    /// The database could not be opened.
    #[error("failed to open database: {0}")]
    Open(String),

    /// A transaction could not be started, committed or aborted.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// The backend reported an unexpected failure.
    #[error("internal storage error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Returns `true` if this is [`StorageError::KeyNotFound`].
    #[must_use]
    pub const fn is_key_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound)
    }

    /// Returns `true` if a key or store was missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound | Self::StoreNotFound(_))
    }

    /// Returns `true` if the operation was refused because the transaction is read-only.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        matches!(self, Self::TransactionReadOnly)
    }

    /// Returns `true` if the caller can recover by retrying, taking another
    /// path, or aborting its own work.
    ///
    /// Only poisoned locks and backend failures are reported as unrecoverable.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::LockPoisoned(_) | Self::Internal(_))
    }

    pub(crate) fn poisoned(what: &str) -> Self {
        tracing::warn!(lock = what, "lock poisoned");
        Self::LockPoisoned(what.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates() {
        assert!(StorageError::KeyNotFound.is_key_not_found());
        assert!(StorageError::KeyNotFound.is_not_found());
        assert!(StorageError::StoreNotFound("t".into()).is_not_found());
        assert!(!StorageError::StoreNotFound("t".into()).is_key_not_found());
        assert!(StorageError::TransactionReadOnly.is_read_only());
        assert!(StorageError::WriterActive.is_recoverable());
        assert!(!StorageError::Internal("boom".into()).is_recoverable());
    }

    #[test]
    fn messages() {
        assert_eq!(
            StorageError::StoreNotFound("users".into()).to_string(),
            "store not found: users"
        );
        assert_eq!(
            StorageError::TransactionsActive(2).to_string(),
            "cannot close engine: 2 transaction(s) still active"
        );
        assert_eq!(
            StorageError::InvalidStoreName(String::new()).to_string(),
            "invalid store name: \"\""
        );
    }
}
