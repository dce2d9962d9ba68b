//! In-memory key-value store.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::{KeyValueStore, StorageError};

/// Key-value store held in memory.
///
/// Clones share the same entries.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    items: Arc<RwLock<HashMap<String, String>>>,
    available: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            items: Arc::new(RwLock::new(HashMap::new())),
            available: true,
        }
    }

    /// A store that reports itself unavailable, as a browser does with
    /// storage disabled.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Remove a key.
    pub fn remove_item(&self, key: &str) {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn is_available(&self) -> bool {
        self.available
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        if !self.available {
            return Err(StorageError::Unavailable("memory store disabled".to_string()));
        }
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if !self.available {
            return Err(StorageError::Unavailable("memory store disabled".to_string()));
        }
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_items(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError> {
        if !self.available {
            return Err(StorageError::Unavailable("memory store disabled".to_string()));
        }
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        Ok(keys.iter().map(|key| items.get(*key).cloned()).collect())
    }

    fn set_items(&self, updates: &[(&str, &str)]) -> Result<(), StorageError> {
        if !self.available {
            return Err(StorageError::Unavailable("memory store disabled".to_string()));
        }
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in updates {
            items.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }
}
