//! Key-value persistence seam
//!
//! Services persist JSON documents under fixed string keys through an
//! injected backend: in-memory for tests and default runs, one file per key
//! for durable deployments.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub trait KeyValueStorage: Send + Sync {
    fn read_raw(&self, key: &str) -> Option<String>;
    fn write_raw(&self, key: &str, value: &str) -> bool;
    fn remove(&self, key: &str) -> bool;
}

/// Reads and deserializes the document stored under `key`.
pub fn get_json<T: DeserializeOwned>(storage: &dyn KeyValueStorage, key: &str) -> Option<T> {
    let raw = storage.read_raw(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(key, %err, "stored document failed to deserialize");
            None
        }
    }
}

/// Serializes and stores a document under `key`.
pub fn set_json<T: Serialize>(storage: &dyn KeyValueStorage, key: &str, value: &T) -> bool {
    match serde_json::to_string(value) {
        Ok(raw) => storage.write_raw(key, &raw),
        Err(err) => {
            tracing::error!(key, %err, "document failed to serialize");
            false
        }
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn read_raw(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn write_raw(&self, key: &str, value: &str) -> bool {
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.insert(key.to_string(), value.to_string());
                true
            }
            Err(_) => false,
        }
    }

    fn remove(&self, key: &str) -> bool {
        match self.entries.lock() {
            Ok(mut entries) => entries.remove(key).is_some(),
            Err(_) => false,
        }
    }
}

/// One `<key>.json` file per key under a data directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStorage for FileStorage {
    fn read_raw(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for(key)).ok()
    }

    fn write_raw(&self, key: &str, value: &str) -> bool {
        if let Err(err) = std::fs::create_dir_all(&self.dir) {
            tracing::error!(%err, "failed to create data directory");
            return false;
        }
        match std::fs::write(self.path_for(key), value) {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(key, %err, "failed to write document");
                false
            }
        }
    }

    fn remove(&self, key: &str) -> bool {
        std::fs::remove_file(self.path_for(key)).is_ok()
    }
}
