//! In-memory store.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::entries::Entries;
use crate::{KvStore, StoreError};

/// A [`KvStore`] that keeps everything in process memory.
///
/// Nothing survives a restart. Useful for tests, demos, and deployments
/// where the local maps are treated as a cache.
#[derive(Debug)]
pub struct MemoryStore<V> {
    entries: Mutex<Entries<V>>,
}

impl<V> MemoryStore<V> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries<V>> {
        // A panic while holding the lock cannot leave `Entries` half
        // updated (every mutation is a single Vec operation), so a
        // poisoned lock is still safe to use.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> KvStore<V> for MemoryStore<V>
where
    V: Clone + Send + 'static,
{
    fn get(&self, key: &str) -> Result<Option<V>, StoreError> {
        Ok(self.lock().get(key))
    }

    fn put(&self, key: &str, value: V) -> Result<(), StoreError> {
        self.lock().put(key, value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.lock().delete(key))
    }

    fn scan(
        &self,
        predicate: &dyn Fn(&str, &V) -> bool,
    ) -> Result<Vec<(String, V)>, StoreError> {
        Ok(self.lock().scan(predicate))
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock().len())
    }
}
