//! Blob store abstraction
//!
//! A blob store is flat: it only knows keys and prefix listings. Directories
//! are emulated on top of it by [`crate::directory`].
//!
//! Two stores are bundled:
//! - [`MemoryBlobStore`] for tests and embedding
//! - [`DirectoryBlobStore`], a flat store emulated in one local directory per container

mod directory;
mod memory;

pub use directory::DirectoryBlobStore;
pub use memory::MemoryBlobStore;

use crate::error::BackendError;
use std::collections::BTreeSet;
use std::time::SystemTime;

/// Properties of a stored blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobItem {
    pub key: String,
    pub size: u64,
    pub last_modified: SystemTime,
}

/// One result of a prefix listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobEntry {
    /// A stored blob
    Blob(BlobItem),
    /// A virtual folder, reported only by delimited listings (no trailing `/`)
    Prefix(String),
}

impl BlobEntry {
    pub fn key(&self) -> &str {
        match self {
            Self::Blob(item) => &item.key,
            Self::Prefix(key) => key,
        }
    }
}

/// Flat, prefix-addressed object store
///
/// Calls are blocking. Timeouts and retries belong to the implementation.
pub trait BlobStore: Send + Sync {
    /// List entries whose key starts with `prefix`
    ///
    /// With `delimited`, only entries directly under `prefix` are returned and
    /// deeper keys are folded into [`BlobEntry::Prefix`] entries. Without it,
    /// every blob under `prefix` is returned and no prefixes are reported.
    fn list(
        &self,
        container: &str,
        prefix: &str,
        delimited: bool,
    ) -> Result<Vec<BlobEntry>, BackendError>;

    fn exists(&self, container: &str, key: &str) -> Result<bool, BackendError>;

    fn get(&self, container: &str, key: &str) -> Result<Vec<u8>, BackendError>;

    /// Create or overwrite a blob
    fn put(&self, container: &str, key: &str, data: &[u8]) -> Result<(), BackendError>;

    /// Delete a blob; deleting a missing blob succeeds
    fn delete(&self, container: &str, key: &str) -> Result<(), BackendError>;

    /// Server-side copy, possibly across containers
    fn copy(
        &self,
        source_container: &str,
        source_key: &str,
        dest_container: &str,
        dest_key: &str,
    ) -> Result<(), BackendError>;

    /// Check whether any blob exists under `prefix`
    fn any_with_prefix(&self, container: &str, prefix: &str) -> Result<bool, BackendError> {
        Ok(!self.list(container, prefix, false)?.is_empty())
    }
}

/// Shape a flat set of blobs under `prefix` into a listing
pub(crate) fn shape_listing(prefix: &str, items: Vec<BlobItem>, delimited: bool) -> Vec<BlobEntry> {
    if !delimited {
        return items.into_iter().map(BlobEntry::Blob).collect();
    }

    let mut folders = BTreeSet::new();
    let mut entries = Vec::new();
    for item in items {
        let rest = &item.key[prefix.len()..];
        match rest.split_once('/') {
            Some((folder, _)) => {
                folders.insert(format!("{}{}", prefix, folder));
            }
            None => entries.push(BlobEntry::Blob(item)),
        }
    }
    entries.extend(folders.into_iter().map(BlobEntry::Prefix));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(key: &str) -> BlobItem {
        BlobItem {
            key: key.to_string(),
            size: 0,
            last_modified: SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_shape_delimited() {
        let items = vec![
            item("root/a/b/file1"),
            item("root/a/file2"),
            item("root/file3"),
            item("root/c/file4"),
        ];
        let entries = shape_listing("root/", items, true);

        let keys: Vec<&str> = entries.iter().map(|e| e.key()).collect();
        assert_eq!(keys, vec!["root/file3", "root/a", "root/c"]);
        assert!(matches!(entries[0], BlobEntry::Blob(_)));
        assert!(matches!(entries[1], BlobEntry::Prefix(_)));
    }

    #[test]
    fn test_shape_flat() {
        let items = vec![item("root/a/b/file1"), item("root/file3")];
        let entries = shape_listing("root/", items, false);
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| matches!(e, BlobEntry::Blob(_))));
    }
}
