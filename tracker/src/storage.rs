//! Key-value persistence for tracker settings and visit state.
//!
//! The tracker persists two values: the last-visit instant used for daily
//! uniqueness, and the opt-out flag. Both go through the [`Storage`] trait so
//! that embedders can plug in their own store and tests can use
//! [`MemoryStorage`].
//!
//! Values live in a [`StorageScope`]. The default scope is private to the
//! process; a shared scope is a named area that several cooperating processes
//! (an app and its extensions, for instance) read and write together.
//!
//! [`FileStorage`] keeps one JSON document per scope in a directory:
//!
//! ```text
//! <dir>/default.json
//! <dir>/suite.<name>.json
//! ```

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::warn;

/// File holding the default scope.
const DEFAULT_SCOPE_FILE: &str = "default.json";

/// Prefix for files holding shared scopes.
const SHARED_SCOPE_PREFIX: &str = "suite.";

/// Errors that can occur while reading or writing persisted values.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be encoded or decoded.
    #[error("storage encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// The scope name cannot be used as a storage location.
    #[error("invalid storage scope name: {0:?}")]
    InvalidScope(String),

    /// No platform data directory is available for the default location.
    #[error("failed to determine data directory")]
    NoDataDirectory,
}

/// A named persistence area.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageScope {
    /// The process-private scope.
    Default,
    /// A scope shared between cooperating processes, identified by name.
    Shared(String),
}

impl StorageScope {
    /// Maps an optional shared scope name to a scope.
    ///
    /// ```
    /// use simpleanalytics::storage::StorageScope;
    ///
    /// assert_eq!(StorageScope::from_name(None), StorageScope::Default);
    /// assert_eq!(
    ///     StorageScope::from_name(Some("group.app")),
    ///     StorageScope::Shared("group.app".to_string())
    /// );
    /// ```
    #[must_use]
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some(name) => Self::Shared(name.to_string()),
            None => Self::Default,
        }
    }
}

/// A key-value store partitioned into scopes.
///
/// Implementations must be safe to share between tasks. Each call is
/// independent; no atomicity is promised across a `get` followed by a `set`.
///
/// Calls are synchronous and may block on I/O. The tracker runs them on
/// tokio's blocking pool when called from async code.
pub trait Storage: Send + Sync {
    /// Reads the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    fn get(&self, scope: &StorageScope, key: &str) -> Result<Option<Value>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be written.
    fn set(&self, scope: &StorageScope, key: &str, value: Value) -> Result<(), StorageError>;
}

/// Reads and decodes a typed value.
pub(crate) fn read<T: DeserializeOwned>(
    storage: &dyn Storage,
    scope: &StorageScope,
    key: &str,
) -> Result<Option<T>, StorageError> {
    storage
        .get(scope, key)?
        .map(serde_json::from_value)
        .transpose()
        .map_err(StorageError::from)
}

/// Encodes and writes a typed value.
pub(crate) fn write<T: Serialize>(
    storage: &dyn Storage,
    scope: &StorageScope,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    storage.set(scope, key, serde_json::to_value(value)?)
}

/// In-memory store, lost when the process exits.
///
/// Cloning is not supported; share it behind an `Arc` to let several trackers
/// see the same scopes.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    scopes: Mutex<HashMap<StorageScope, HashMap<String, Value>>>,
}

impl MemoryStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, scope: &StorageScope, key: &str) -> Result<Option<Value>, StorageError> {
        let scopes = self.scopes.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(scopes.get(scope).and_then(|values| values.get(key)).cloned())
    }

    fn set(&self, scope: &StorageScope, key: &str, value: Value) -> Result<(), StorageError> {
        let mut scopes = self.scopes.lock().unwrap_or_else(PoisonError::into_inner);
        scopes
            .entry(scope.clone())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }
}

/// Store that keeps each scope in a JSON file under a directory.
///
/// Each write goes to its own uniquely named temporary file that is then
/// renamed over the scope file, so readers and writers in other processes
/// never observe a half-written document. Concurrent writers from different
/// processes may still overwrite each other's keys (last rename wins).
///
/// A scope file that no longer parses is reported by [`Storage::get`] and
/// replaced on the next [`Storage::set`].
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a store in the platform data directory.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NoDataDirectory` if no home directory is known.
    pub fn open_default() -> Result<Self, StorageError> {
        Ok(Self::new(Self::default_dir()?))
    }

    /// Returns the platform data directory used by [`open_default`](Self::open_default).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NoDataDirectory` if no home directory is known.
    pub fn default_dir() -> Result<PathBuf, StorageError> {
        ProjectDirs::from("com", "simpleanalytics", "simpleanalytics")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or(StorageError::NoDataDirectory)
    }

    /// Returns the root directory of this store.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn scope_path(&self, scope: &StorageScope) -> Result<PathBuf, StorageError> {
        let file = match scope {
            StorageScope::Default => DEFAULT_SCOPE_FILE.to_string(),
            StorageScope::Shared(name) => {
                if name.is_empty()
                    || name.starts_with('.')
                    || name.contains(['/', '\\'])
                    || name.contains('\0')
                {
                    return Err(StorageError::InvalidScope(name.clone()));
                }
                format!("{SHARED_SCOPE_PREFIX}{name}.json")
            }
        };
        Ok(self.dir.join(file))
    }

    fn load(path: &Path) -> Result<Map<String, Value>, StorageError> {
        match fs::read_to_string(path) {
            Ok(contents) if contents.trim().is_empty() => Ok(Map::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Storage for FileStorage {
    fn get(&self, scope: &StorageScope, key: &str) -> Result<Option<Value>, StorageError> {
        let path = self.scope_path(scope)?;
        Ok(Self::load(&path)?.remove(key))
    }

    fn set(&self, scope: &StorageScope, key: &str, value: Value) -> Result<(), StorageError> {
        let path = self.scope_path(scope)?;
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut values = match Self::load(&path) {
            Ok(values) => values,
            Err(StorageError::Json(e)) => {
                warn!(path = %path.display(), error = %e, "Replacing unreadable storage file");
                Map::new()
            }
            Err(e) => return Err(e),
        };
        values.insert(key.to_string(), value);

        fs::create_dir_all(&self.dir)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&serde_json::to_vec_pretty(&values)?)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        Ok(())
    }
}
