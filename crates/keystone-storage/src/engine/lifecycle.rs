//! Engine open/close bookkeeping shared by the backends.
//!
//! Every transaction holds an [`ActiveGuard`]; `close` is refused while any
//! guard is alive, and `begin` is refused once the engine is closed.

use std::sync::Mutex;

use super::{StorageError, StorageResult};

#[derive(Debug, Default)]
struct State {
    closed: bool,
    active: usize,
}

/// Tracks whether an engine is closed and how many transactions it has alive.
#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    state: Mutex<State>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a new transaction.
    pub(crate) fn enter(&self) -> StorageResult<ActiveGuard<'_>> {
        let mut state =
            self.state.lock().map_err(|_| StorageError::poisoned("engine lifecycle"))?;
        if state.closed {
            return Err(StorageError::Closed);
        }
        state.active += 1;
        Ok(ActiveGuard { lifecycle: self })
    }

    /// Mark the engine closed.
    ///
    /// Returns `Ok(true)` on the first successful call and `Ok(false)` if the
    /// engine was already closed.
    pub(crate) fn close(&self) -> StorageResult<bool> {
        let mut state =
            self.state.lock().map_err(|_| StorageError::poisoned("engine lifecycle"))?;
        if state.closed {
            return Ok(false);
        }
        if state.active > 0 {
            tracing::warn!(
                active = state.active,
                "refusing to close engine with active transactions"
            );
            return Err(StorageError::TransactionsActive(state.active));
        }
        state.closed = true;
        Ok(true)
    }

    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().map_or(true, |state| state.closed)
    }

    #[cfg(test)]
    pub(crate) fn active(&self) -> usize {
        self.state.lock().map_or(0, |state| state.active)
    }
}

/// Keeps its transaction counted as active until dropped.
#[derive(Debug)]
pub(crate) struct ActiveGuard<'a> {
    lifecycle: &'a Lifecycle,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        // A poisoned lock only means another thread panicked mid-update; the
        // counter itself is still meaningful.
        let mut state = match self.lifecycle.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.active = state.active.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_block_close() {
        let lifecycle = Lifecycle::new();
        let guard = lifecycle.enter().expect("enter");
        assert_eq!(lifecycle.active(), 1);

        let err = lifecycle.close().expect_err("close with active guard");
        assert!(matches!(err, StorageError::TransactionsActive(1)));

        drop(guard);
        assert_eq!(lifecycle.active(), 0);
        assert!(lifecycle.close().expect("close"));
        assert!(lifecycle.is_closed());
    }

    #[test]
    fn closed_rejects_enter_and_close_is_idempotent() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.close().expect("close"));
        assert!(!lifecycle.close().expect("second close"));
        assert!(matches!(lifecycle.enter(), Err(StorageError::Closed)));
    }
}
