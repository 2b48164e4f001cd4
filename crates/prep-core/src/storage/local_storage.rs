use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use thiserror::Error;

/// Errors produced by client-local storage backends.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    /// Backend cannot be read or written (disabled, I/O failure, poisoned lock).
    #[error("storage unavailable: {reason}")]
    Unavailable { reason: String },
    /// Writing the entry would exceed the backend's capacity.
    #[error("storage quota exceeded writing {name} (limit {limit} bytes)")]
    QuotaExceeded { name: String, limit: usize },
}

/// String-keyed, string-valued storage region local to one client.
///
/// Every call completes before returning. Backends perform no coordination
/// between writers; the last `set_item` for a name wins.
pub trait LocalStorage: Send + Sync {
    /// Read the raw value stored under `name`, `None` when absent.
    fn get_item(&self, name: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `name`, overwriting any existing entry.
    fn set_item(&self, name: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the entry for `name` (idempotent).
    fn remove_item(&self, name: &str) -> Result<(), StorageError>;
}

impl<T: LocalStorage + ?Sized> LocalStorage for Arc<T> {
    fn get_item(&self, name: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(name)
    }

    fn set_item(&self, name: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(name, value)
    }

    fn remove_item(&self, name: &str) -> Result<(), StorageError> {
        (**self).remove_item(name)
    }
}

/// In-memory storage for tests and ephemeral sessions.
/// Clones share the same underlying map, like two handles on one browser profile.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStorage {
    inner: Arc<Mutex<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes once the total size of names and values
    /// would exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            inner: Arc::default(),
            quota: Some(bytes),
        }
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.inner.lock().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LocalStorage for InMemoryStorage {
    fn get_item(&self, name: &str) -> Result<Option<String>, StorageError> {
        let map = self.inner.lock().map_err(poisoned)?;
        Ok(map.get(name).cloned())
    }

    fn set_item(&self, name: &str, value: &str) -> Result<(), StorageError> {
        let mut map = self.inner.lock().map_err(poisoned)?;

        if let Some(limit) = self.quota {
            let others: usize = map
                .iter()
                .filter(|(key, _)| key.as_str() != name)
                .map(|(key, val)| key.len() + val.len())
                .sum();
            if others + name.len() + value.len() > limit {
                return Err(StorageError::QuotaExceeded {
                    name: name.to_string(),
                    limit,
                });
            }
        }

        map.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, name: &str) -> Result<(), StorageError> {
        let mut map = self.inner.lock().map_err(poisoned)?;
        map.remove(name);
        Ok(())
    }
}

fn poisoned<E: std::fmt::Display>(err: E) -> StorageError {
    StorageError::Unavailable {
        reason: format!("lock poisoned: {err}"),
    }
}
