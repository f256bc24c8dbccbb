//! Flat blob store emulated in local directories
//!
//! Each container is a directory under the store root and each blob is a
//! single file in it. Keys are escaped into file names (`%` as `%25`, `/` as
//! `%2F`) so the container directory stays flat, just like a real object store.

use super::{BlobEntry, BlobItem, BlobStore, shape_listing};
use crate::error::BackendError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Blob store backed by one flat directory per container
#[derive(Debug, Clone)]
pub struct DirectoryBlobStore {
    root: PathBuf,
}

impl DirectoryBlobStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn container_dir(&self, container: &str) -> PathBuf {
        self.root.join(escape_key(container))
    }

    fn blob_path(&self, container: &str, key: &str) -> PathBuf {
        self.container_dir(container).join(escape_key(key))
    }
}

fn escape_key(key: &str) -> String {
    key.replace('%', "%25").replace('/', "%2F")
}

fn unescape_key(name: &str) -> String {
    name.replace("%2F", "/").replace("%25", "%")
}

fn io_error(path: &Path, source: std::io::Error) -> BackendError {
    BackendError::io(path.display().to_string(), source)
}

impl BlobStore for DirectoryBlobStore {
    fn list(
        &self,
        container: &str,
        prefix: &str,
        delimited: bool,
    ) -> Result<Vec<BlobEntry>, BackendError> {
        let dir = self.container_dir(container);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut items = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(|e| io_error(&dir, e))? {
            let entry = entry.map_err(|e| io_error(&dir, e))?;
            let Some(name) = entry.file_name().to_str().map(unescape_key) else {
                continue;
            };
            if !name.starts_with(prefix) {
                continue;
            }
            let metadata = entry.metadata().map_err(|e| io_error(&entry.path(), e))?;
            if !metadata.is_file() {
                continue;
            }
            items.push(BlobItem {
                key: name,
                size: metadata.len(),
                last_modified: metadata
                    .modified()
                    .map_err(|e| io_error(&entry.path(), e))?,
            });
        }
        items.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(shape_listing(prefix, items, delimited))
    }

    fn exists(&self, container: &str, key: &str) -> Result<bool, BackendError> {
        Ok(self.blob_path(container, key).is_file())
    }

    fn get(&self, container: &str, key: &str) -> Result<Vec<u8>, BackendError> {
        let path = self.blob_path(container, key);
        std::fs::read(&path).map_err(|e| io_error(&path, e))
    }

    fn put(&self, container: &str, key: &str, data: &[u8]) -> Result<(), BackendError> {
        let dir = self.container_dir(container);
        std::fs::create_dir_all(&dir).map_err(|e| io_error(&dir, e))?;
        let path = self.blob_path(container, key);
        log::trace!("put {}:{} -> {}", container, key, path.display());
        std::fs::write(&path, data).map_err(|e| io_error(&path, e))
    }

    fn delete(&self, container: &str, key: &str) -> Result<(), BackendError> {
        let path = self.blob_path(container, key);
        log::trace!("delete {}:{}", container, key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    fn copy(
        &self,
        source_container: &str,
        source_key: &str,
        dest_container: &str,
        dest_key: &str,
    ) -> Result<(), BackendError> {
        let source = self.blob_path(source_container, source_key);
        let dest_dir = self.container_dir(dest_container);
        std::fs::create_dir_all(&dest_dir).map_err(|e| io_error(&dest_dir, e))?;
        let dest = self.blob_path(dest_container, dest_key);
        std::fs::copy(&source, &dest).map_err(|e| io_error(&source, e))?;
        Ok(())
    }
}
