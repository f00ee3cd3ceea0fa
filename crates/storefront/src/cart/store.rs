//! Local persistent storage for cart snapshots.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use uuid::Uuid;

/// Errors from a snapshot store.
#[derive(Debug, Error)]
pub enum SnapshotStoreError {
    #[error("snapshot I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Key-value storage for serialized snapshots on this device.
pub trait SnapshotStore {
    /// Read the value for a key, `None` if nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>, SnapshotStoreError>;

    /// Store a value, overwriting any previous value for the key.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be written.
    fn save(&self, key: &str, value: &str) -> Result<(), SnapshotStoreError>;

    /// Remove a key. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be written.
    fn remove(&self, key: &str) -> Result<(), SnapshotStoreError>;
}

// =============================================================================
// In-memory store
// =============================================================================

/// Store backed by a shared map. Clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value for a key, for inspection.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Put a raw value, bypassing the cart (e.g., to simulate corruption).
    pub fn put(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, key: &str) -> Result<Option<String>, SnapshotStoreError> {
        Ok(self.get(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), SnapshotStoreError> {
        self.put(key, value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SnapshotStoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

// =============================================================================
// File store
// =============================================================================

/// Store that keeps one JSON file per key inside a directory.
///
/// Writes go to a temporary file first and are renamed into place, so a
/// crash mid-write never leaves a half-written snapshot behind.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }
}

/// Keys made of `[A-Za-z0-9_-]` are used verbatim; anything else is hex-escaped.
fn file_stem(key: &str) -> String {
    let safe = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if safe {
        return key.to_string();
    }

    let mut stem = String::from("x");
    for byte in key.bytes() {
        let _ = write!(stem, "{byte:02x}");
    }
    stem
}

fn io_error(path: &Path, source: std::io::Error) -> SnapshotStoreError {
    SnapshotStoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self, key: &str) -> Result<Option<String>, SnapshotStoreError> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), SnapshotStoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, e))?;

        let path = self.path_for(key);
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", file_stem(key), Uuid::new_v4().simple()));

        std::fs::write(&tmp, value).map_err(|e| io_error(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            io_error(&path, e)
        })
    }

    fn remove(&self, key: &str) -> Result<(), SnapshotStoreError> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, e)),
        }
    }
}
