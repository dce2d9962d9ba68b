//! String-valued key-value storage for station snapshots.
//!
//! The local cache provider reads a snapshot from a [`KeyValueStore`]; the
//! binary writes one with [`save_snapshot`] after each remote refresh.

mod file;
mod memory;
mod snapshot;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use snapshot::{LAST_UPDATE_KEY, STARRED_IDS_KEY, STATIONS_KEY, save_snapshot};

/// Errors from a key-value store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The store cannot be used
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Reading or writing the backing medium failed
    #[error("storage I/O error: {message}")]
    Io { message: String },

    /// A value could not be encoded or the backing file is malformed
    #[error("storage encoding error: {message}")]
    Encoding { message: String },
}

/// A string-valued key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Whether the store can be used at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Read a value. `Ok(None)` if the key is absent.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Read several values, returned in `keys` order.
    ///
    /// Stores that can do so answer from a single read, so the values all
    /// come from the same state of the store.
    fn get_items(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError> {
        keys.iter().map(|key| self.get_item(key)).collect()
    }

    /// Write several values in order.
    fn set_items(&self, items: &[(&str, &str)]) -> Result<(), StorageError> {
        for (key, value) in items {
            self.set_item(key, value)?;
        }
        Ok(())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn get_items(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError> {
        (**self).get_items(keys)
    }

    fn set_items(&self, items: &[(&str, &str)]) -> Result<(), StorageError> {
        (**self).set_items(items)
    }
}
