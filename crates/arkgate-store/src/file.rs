//! JSON-document store with atomic replace-on-write.
//!
//! The whole store is one JSON object on disk. It's loaded once at open
//! and every mutation rewrites the document:
//!
//! ```text
//! put/delete ──→ clone entries ──→ apply change ──→ write .tmp ──→ fsync ──→ rename
//!                                                                            │
//!                                        swap in-memory copy ←── on success ─┘
//! ```
//!
//! The rename is atomic on the same filesystem, so a reader (or a crash)
//! sees either the old document or the new one, never a torn write. The
//! mutex serializes writers within the process, so two concurrent `put`s
//! can't race each other into a lost update.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::entries::Entries;
use crate::{KvStore, StoreError};

/// A [`KvStore`] persisted as a single JSON document.
#[derive(Debug)]
pub struct JsonFileStore<V> {
    path: PathBuf,
    entries: Mutex<Entries<V>>,
}

impl<V> JsonFileStore<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    /// Opens the store at `path`, loading its current contents.
    ///
    /// A missing file is an empty store; it is created on the first write.
    /// An empty file is treated the same way.
    ///
    /// # Errors
    /// - [`StoreError::Io`] if the file exists but can't be read.
    /// - [`StoreError::Decode`] if it doesn't contain a JSON object.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if path.file_name().is_none() {
            return Err(StoreError::InvalidPath(path));
        }

        let entries = match fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => {
                Entries::default()
            }
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| {
                StoreError::Decode {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Entries::default(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        tracing::debug!(path = %path.display(), entries = entries.len(), "store opened");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Entries<V>> {
        // Mutations only swap in a fully built copy, so poisoning can't
        // expose partial state.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `change` to a copy of the entries, persists the copy, and
    /// only then makes it visible.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Entries<V>) -> T,
    ) -> Result<T, StoreError> {
        let mut guard = self.lock();
        let mut next = guard.clone();
        let out = change(&mut next);
        let document = serde_json::to_vec_pretty(&next).map_err(StoreError::Encode)?;
        atomic_write(&self.path, &document)?;
        *guard = next;
        Ok(out)
    }
}

impl<V> KvStore<V> for JsonFileStore<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + 'static,
{
    fn get(&self, key: &str) -> Result<Option<V>, StoreError> {
        Ok(self.lock().get(key))
    }

    fn put(&self, key: &str, value: V) -> Result<(), StoreError> {
        self.mutate(|entries| entries.put(key, value))
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        // Skip the rewrite when there's nothing to remove.
        if self.lock().get(key).is_none() {
            return Ok(false);
        }
        self.mutate(|entries| entries.delete(key))
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

/// Writes `content` to a sibling temp file, fsyncs it, and renames it over
/// `path`. On failure the temp file is removed and `path` is untouched.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| StoreError::InvalidPath(path.to_path_buf()))?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(io_err)?;

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let tmp_path = dir.join(format!(".{file_name}.arkgate.tmp.{nanos}"));

    let result = (|| -> io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;
        if let Ok(parent) = fs::File::open(&dir) {
            let _ = parent.sync_all();
        }
        Ok(())
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path);
        tracing::warn!(path = %path.display(), error = %e, "store write failed");
        return Err(io_err(e));
    }
    Ok(())
}
