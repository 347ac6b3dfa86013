//! The process-wide bearer credential for the remote store.

use std::sync::{PoisonError, RwLock};

/// Holds the current access credential.
///
/// One `Credential` is shared (behind an `Arc`) by everything that talks to
/// the remote store. Readers take a snapshot with [`current`](Self::current);
/// the [`AuthRefresher`](crate::AuthRefresher) swaps in a new value with
/// [`replace`](Self::replace). A reader never sees a half-written value.
#[derive(Debug, Default)]
pub struct Credential {
    value: RwLock<Option<String>>,
}

impl Credential {
    /// Creates a holder with an optional initial credential.
    pub fn new(initial: Option<String>) -> Self {
        Self {
            value: RwLock::new(initial.filter(|v| !v.is_empty())),
        }
    }

    /// Snapshot of the current credential.
    pub fn current(&self) -> Option<String> {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Atomically replaces the credential, returning the previous one.
    pub fn replace(&self, next: impl Into<String>) -> Option<String> {
        let mut guard = self.value.write().unwrap_or_else(PoisonError::into_inner);
        guard.replace(next.into())
    }

    /// Returns `true` if a credential is present.
    pub fn is_set(&self) -> bool {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
