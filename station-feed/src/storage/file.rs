//! Disk-backed key-value store.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::{KeyValueStore, StorageError};

/// Key-value store persisted as a single JSON object on disk.
///
/// Every write rewrites the whole file through a temporary sibling that is
/// renamed into place, so readers never see a partly written file. A missing
/// file reads as an empty store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Get the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(StorageError::Io {
                    message: format!("failed to read {}: {}", self.path.display(), e),
                });
            }
        };

        serde_json::from_str(&contents).map_err(|e| StorageError::Encoding {
            message: format!("malformed store file {}: {}", self.path.display(), e),
        })
    }
}

impl KeyValueStore for FileStore {
    fn is_available(&self) -> bool {
        !self.path.is_dir()
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.set_items(&[(key, value)])
    }

    fn get_items(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError> {
        let mut items = self.read_all()?;
        Ok(keys.iter().map(|key| items.remove(*key)).collect())
    }

    fn set_items(&self, updates: &[(&str, &str)]) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut items = self.read_all()?;
        for (key, value) in updates {
            items.insert(key.to_string(), value.to_string());
        }

        // Create parent directories if needed
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Io {
                message: format!("failed to create store directory: {}", e),
            })?;
        }

        let json = serde_json::to_string_pretty(&items).map_err(|e| StorageError::Encoding {
            message: format!("failed to serialize store: {}", e),
        })?;

        let tmp = self.tmp_path();
        std::fs::write(&tmp, json).map_err(|e| StorageError::Io {
            message: format!("failed to write store file: {}", e),
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| StorageError::Io {
            message: format!("failed to replace store file: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_reads_empty() {
        let store = FileStore::new("/nonexistent/path/store.json");
        assert!(store.is_available());
        assert_eq!(store.get_item("stations").unwrap(), None);
    }

    #[test]
    fn values_persist_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        FileStore::new(&path).set_item("lastStationsUpdate", "42").unwrap();
        FileStore::new(&path).set_item("stations", "[]").unwrap();

        let store = FileStore::new(&path);
        assert_eq!(
            store.get_item("lastStationsUpdate").unwrap().as_deref(),
            Some("42")
        );
        assert_eq!(store.get_item("stations").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("dir").join("store.json");

        FileStore::new(&path).set_item("k", "v").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn directory_path_is_unavailable() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(!store.is_available());
    }

    #[test]
    fn get_items_follows_key_order() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("store.json"));
        store.set_items(&[("a", "1"), ("b", "2")]).unwrap();

        assert_eq!(
            store.get_items(&["b", "missing", "a"]).unwrap(),
            vec![Some("2".to_string()), None, Some("1".to_string())]
        );
    }

    #[test]
    fn set_items_writes_once_and_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = FileStore::new(&path);
        store.set_item("a", "old").unwrap();

        store.set_items(&[("a", "new"), ("b", "2"), ("a", "newest")]).unwrap();

        assert_eq!(store.get_item("a").unwrap().as_deref(), Some("newest"));
        assert_eq!(store.get_item("b").unwrap().as_deref(), Some("2"));
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn malformed_file_is_an_encoding_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        let err = FileStore::new(&path).get_item("k").unwrap_err();
        assert!(matches!(err, StorageError::Encoding { .. }));
    }
}
