//! In-memory blob store

use super::{BlobEntry, BlobItem, BlobStore, shape_listing};
use crate::clock::{Clock, SystemClock};
use crate::error::BackendError;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

#[derive(Debug, Clone)]
struct StoredBlob {
    data: Vec<u8>,
    last_modified: SystemTime,
}

type Blobs = BTreeMap<(String, String), StoredBlob>;

/// Thread-safe blob store held in memory
///
/// Deletes can be made to fail for chosen keys with [`MemoryBlobStore::fail_deletes_for`],
/// which is how best-effort cleanup is exercised in tests.
pub struct MemoryBlobStore {
    blobs: Mutex<Blobs>,
    failing_deletes: Mutex<HashSet<String>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Store that stamps `last_modified` from `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            blobs: Mutex::new(BTreeMap::new()),
            failing_deletes: Mutex::new(HashSet::new()),
            clock,
        }
    }

    /// Make every delete of `key` fail until [`MemoryBlobStore::clear_failures`]
    pub fn fail_deletes_for(&self, key: impl Into<String>) {
        if let Ok(mut failing) = self.failing_deletes.lock() {
            failing.insert(key.into());
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut failing) = self.failing_deletes.lock() {
            failing.clear();
        }
    }

    /// All keys stored in `container`, sorted
    pub fn keys(&self, container: &str) -> Vec<String> {
        match self.blobs.lock() {
            Ok(blobs) => blobs
                .keys()
                .filter(|(c, _)| c == container)
                .map(|(_, k)| k.clone())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Number of blobs across all containers
    pub fn len(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self, container: &str, key: &str) -> Result<MutexGuard<'_, Blobs>, BackendError> {
        self.blobs
            .lock()
            .map_err(|_| BackendError::blob(container, key, "memory store lock poisoned"))
    }
}

impl BlobStore for MemoryBlobStore {
    fn list(
        &self,
        container: &str,
        prefix: &str,
        delimited: bool,
    ) -> Result<Vec<BlobEntry>, BackendError> {
        let blobs = self.lock(container, prefix)?;
        let items = blobs
            .iter()
            .filter(|((c, k), _)| c == container && k.starts_with(prefix))
            .map(|((_, k), blob)| BlobItem {
                key: k.clone(),
                size: blob.data.len() as u64,
                last_modified: blob.last_modified,
            })
            .collect();
        Ok(shape_listing(prefix, items, delimited))
    }

    fn exists(&self, container: &str, key: &str) -> Result<bool, BackendError> {
        let blobs = self.lock(container, key)?;
        Ok(blobs.contains_key(&(container.to_string(), key.to_string())))
    }

    fn get(&self, container: &str, key: &str) -> Result<Vec<u8>, BackendError> {
        let blobs = self.lock(container, key)?;
        blobs
            .get(&(container.to_string(), key.to_string()))
            .map(|blob| blob.data.clone())
            .ok_or_else(|| BackendError::blob(container, key, "blob not found"))
    }

    fn put(&self, container: &str, key: &str, data: &[u8]) -> Result<(), BackendError> {
        log::trace!("put {}:{} ({} bytes)", container, key, data.len());
        let last_modified = self.clock.now();
        let mut blobs = self.lock(container, key)?;
        blobs.insert(
            (container.to_string(), key.to_string()),
            StoredBlob {
                data: data.to_vec(),
                last_modified,
            },
        );
        Ok(())
    }

    fn delete(&self, container: &str, key: &str) -> Result<(), BackendError> {
        log::trace!("delete {}:{}", container, key);
        let failing = self
            .failing_deletes
            .lock()
            .map(|f| f.contains(key))
            .unwrap_or(false);
        if failing {
            return Err(BackendError::blob(container, key, "injected delete failure"));
        }
        let mut blobs = self.lock(container, key)?;
        blobs.remove(&(container.to_string(), key.to_string()));
        Ok(())
    }

    fn copy(
        &self,
        source_container: &str,
        source_key: &str,
        dest_container: &str,
        dest_key: &str,
    ) -> Result<(), BackendError> {
        log::trace!(
            "copy {}:{} -> {}:{}",
            source_container,
            source_key,
            dest_container,
            dest_key
        );
        let last_modified = self.clock.now();
        let mut blobs = self.lock(source_container, source_key)?;
        let data = blobs
            .get(&(source_container.to_string(), source_key.to_string()))
            .map(|blob| blob.data.clone())
            .ok_or_else(|| BackendError::blob(source_container, source_key, "blob not found"))?;
        blobs.insert(
            (dest_container.to_string(), dest_key.to_string()),
            StoredBlob {
                data,
                last_modified,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_list_delete() {
        let store = MemoryBlobStore::new();
        store.put("media", "images/a.jpg", b"a").unwrap();
        store.put("media", "images/2024/b.jpg", b"bb").unwrap();
        store.put("other", "images/c.jpg", b"c").unwrap();

        let flat = store.list("media", "images/", false).unwrap();
        assert_eq!(flat.len(), 2);

        let delimited = store.list("media", "images/", true).unwrap();
        let keys: Vec<&str> = delimited.iter().map(|e| e.key()).collect();
        assert_eq!(keys, vec!["images/a.jpg", "images/2024"]);

        assert!(store.any_with_prefix("media", "images/2024/").unwrap());
        store.delete("media", "images/2024/b.jpg").unwrap();
        assert!(!store.any_with_prefix("media", "images/2024/").unwrap());

        // Deleting a missing blob is not an error
        store.delete("media", "images/missing").unwrap();
    }

    #[test]
    fn test_injected_delete_failure() {
        let store = MemoryBlobStore::new();
        store.put("c", "k", b"").unwrap();
        store.fail_deletes_for("k");
        assert!(store.delete("c", "k").is_err());
        assert!(store.exists("c", "k").unwrap());

        store.clear_failures();
        store.delete("c", "k").unwrap();
        assert!(!store.exists("c", "k").unwrap());
    }

    #[test]
    fn test_copy_across_containers() {
        let store = MemoryBlobStore::new();
        store.put("a", "x/file", b"data").unwrap();
        store.copy("a", "x/file", "b", "y/file").unwrap();

        assert_eq!(store.get("b", "y/file").unwrap(), b"data");
        assert!(store.exists("a", "x/file").unwrap());
        assert!(store.copy("a", "missing", "b", "z").is_err());
    }
}
