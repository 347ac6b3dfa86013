//! Embedded key-value stores for arkgate.
//!
//! Every piece of local state the gateway keeps (issued tokens, the remote
//! identifier map, the username → contract directory) is a small keyed
//! collection. This crate hides how those collections are kept behind the
//! [`KvStore`] trait:
//!
//! - [`MemoryStore`]: process-local, gone on restart. Tests and demos.
//! - [`JsonFileStore`]: one JSON document per store, replaced atomically
//!   on every write (feature `json`, enabled by default).
//!
//! # Ordering
//!
//! Stores remember insertion order. [`KvStore::scan`] returns matches in
//! the order their keys were first inserted, and overwriting an existing
//! key keeps its original position. Callers that pick "the first match"
//! rely on this.
//!
//! ```text
//! Session layer (above)  ← tokens, remote identifier map
//!     ↕
//! Store layer (this crate)  ← get / put / delete / scan
//!     ↕
//! Disk (below)  ← tokens.json, sessions.json, accounts.json
//! ```

mod entries;
mod error;
#[cfg(feature = "json")]
mod file;
mod memory;

pub use error::StoreError;
#[cfg(feature = "json")]
pub use file::JsonFileStore;
pub use memory::MemoryStore;

use std::sync::Arc;

/// A keyed collection of values with insertion-ordered scans.
///
/// Implementations use interior mutability, so every method takes `&self`
/// and a store can sit behind an `Arc` shared by several components.
///
/// # Trait bounds
///
/// - `Send + Sync` → one store is shared by concurrent request handlers.
/// - `'static` → stores live as long as the service that owns them.
pub trait KvStore<V>: Send + Sync + 'static {
    /// Returns a copy of the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<V>, StoreError>;

    /// Inserts `value` under `key`, replacing any previous value in place.
    ///
    /// # Errors
    /// Returns [`StoreError`] if the new state could not be persisted. In
    /// that case the store is left exactly as it was before the call.
    fn put(&self, key: &str, value: V) -> Result<(), StoreError>;

    /// Removes `key`. Returns whether it was present.
    fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Returns every entry for which `predicate` holds, in insertion order.
    fn scan(
        &self,
        predicate: &dyn Fn(&str, &V) -> bool,
    ) -> Result<Vec<(String, V)>, StoreError>;

    /// Returns the number of stored entries.
    fn len(&self) -> Result<usize, StoreError>;

    /// Returns `true` if the store holds no entries.
    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

/// A store shared between components.
pub type SharedStore<V> = Arc<dyn KvStore<V>>;
