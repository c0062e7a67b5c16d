//! Durable string-keyed, string-valued storage for credentials, bindings and
//! workflow parameters.
//!
//! Writes go straight through to the backing medium. Concurrent writers to the
//! same key apply in arrival order and the last write wins.

use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read store \"{}\": {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write store \"{}\": {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store \"{}\" is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode value for \"{key}\": {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure to export or import a settings snapshot.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("invalid snapshot: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid snapshot: {0} is not a JSON object")]
    NotAnObject(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Decode a snapshot document. The document, and each of `sections` it carries,
/// must be a JSON object; anything else is rejected before a value is built.
pub(crate) fn decode_snapshot<T: DeserializeOwned>(
    document: &str,
    sections: &[&str],
) -> Result<T, SnapshotError> {
    let value: serde_json::Value = serde_json::from_str(document)?;

    let object = value
        .as_object()
        .ok_or_else(|| SnapshotError::NotAnObject("the document".to_string()))?;

    for &section in sections {
        match object.get(section) {
            Some(serde_json::Value::Object(_)) | None => {}
            Some(_) => return Err(SnapshotError::NotAnObject(format!("\"{}\"", section))),
        }
    }

    Ok(serde_json::from_value(value)?)
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// All keys currently present, in ascending order.
    fn keys(&self) -> Vec<String>;
}

/// Helpers layered over [`KeyValueStore`] for namespaced and structured values.
pub(crate) trait KeyValueStoreExt: KeyValueStore {
    /// Keys beginning with `prefix`, with the prefix stripped.
    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.keys()
            .into_iter()
            .filter_map(|k| k.strip_prefix(prefix).map(|s| s.to_string()))
            .collect()
    }

    fn remove_prefix(&self, prefix: &str) -> Result<(), StoreError> {
        for key in self.keys_with_prefix(prefix) {
            self.remove(&format!("{}{}", prefix, key))?;
        }

        Ok(())
    }

    /// Read a JSON-encoded value. Undecodable values read as absent.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(key, %err, "ignoring undecodable stored value");
                None
            }
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;

        self.set(key, &raw)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {}

/// A store which lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        lock(&self.entries).insert(key.to_string(), value.to_string());

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        lock(&self.entries).remove(key);

        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        lock(&self.entries).keys().cloned().collect()
    }
}

/// A store persisted as a single JSON object on disk. The whole file is
/// rewritten on every mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store; the file
    /// (and its parent directories) are created on the first write.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<FileStore, StoreError> {
        let path = path.as_ref().to_path_buf();

        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Read { path, source }),
        };

        debug!(path = %path.display(), entries = entries.len(), "opened settings store");

        Ok(FileStore {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        let raw = serde_json::to_string_pretty(entries).map_err(|source| StoreError::Encode {
            key: "*".to_string(),
            source,
        })?;

        // Write to a sibling file first so a crash never leaves a truncated store
        let tmp = self.path.with_extension("tmp");

        std::fs::write(&tmp, raw).map_err(write_err)?;
        std::fs::rename(&tmp, &self.path).map_err(write_err)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    // The map only changes once the new contents are on disk
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = lock(&self.entries);

        let mut updated = entries.clone();
        updated.insert(key.to_string(), value.to_string());

        self.flush(&updated)?;
        *entries = updated;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = lock(&self.entries);

        if !entries.contains_key(key) {
            return Ok(());
        }

        let mut updated = entries.clone();
        updated.remove(key);

        self.flush(&updated)?;
        *entries = updated;

        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        lock(&self.entries).keys().cloned().collect()
    }
}

// A poisoned map is still consistent: each mutation completes under the lock.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
