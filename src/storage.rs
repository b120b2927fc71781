//! Synchronous key-value stores backing persisted UI state

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::StorageError;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process store with an optional byte quota and a kill switch.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
    disabled: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits the summed length of all keys and values.
    pub fn with_quota(limit: usize) -> Self {
        Self {
            quota: Some(limit),
            ..Self::default()
        }
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::SeqCst);
    }

    /// Number of successful `set` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Inserts without counting as a write or checking the quota.
    pub fn seed(&self, key: &str, value: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn check_enabled(&self) -> Result<(), StorageError> {
        if self.disabled.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("storage is disabled".to_string()));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_enabled()?;
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_enabled()?;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(limit) = self.quota {
            let used: usize = entries
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = used + key.len() + value.len();
            if needed > limit {
                return Err(StorageError::QuotaExceeded { needed, limit });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_enabled()?;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("taskboard")
            .join("state")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let stem = encode_key(key)?;
        Ok(self.dir.join(format!("{stem}.json")))
    }
}

/// Percent-encodes `key` into a file stem so distinct keys never share a file.
fn encode_key(key: &str) -> Result<String, StorageError> {
    if key.is_empty() || key == "." || key == ".." || key.contains('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(urlencoding::encode(key).into_owned())
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| StorageError::InvalidKey(key.to_string()))?;
        let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

        fs::write(&tmp_path, value)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
