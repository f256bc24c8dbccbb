//! File-level operations used by recursive directory operations

use super::local::resolve_native;
use crate::blob::BlobStore;
use crate::error::{BackendError, DirectoryError, Result};
use crate::path::PathNormalizer;
use std::path::PathBuf;
use std::sync::Arc;

/// Existence, copy, move and delete of single files by canonical path
pub trait FileOperations: Send + Sync {
    fn exists(&self, path: &str) -> Result<bool>;

    fn copy(&self, source: &str, dest: &str) -> Result<()>;

    /// Move a file; implementations without an atomic rename copy and then
    /// delete the source
    fn move_file(&self, source: &str, dest: &str) -> Result<()>;

    fn delete(&self, path: &str) -> Result<()>;
}

/// File operations spanning the local filesystem and the blob store
///
/// A file present locally is handled locally; anything else is treated as
/// a blob in the container that owns its path.
pub struct HybridFiles {
    normalizer: PathNormalizer,
    blobs: Arc<dyn BlobStore>,
}

impl HybridFiles {
    pub fn new(normalizer: PathNormalizer, blobs: Arc<dyn BlobStore>) -> Self {
        Self { normalizer, blobs }
    }

    fn native(&self, path: &str) -> PathBuf {
        resolve_native(path, self.normalizer.resolve(path).case_sensitive)
    }

    /// Path on disk of `path` when it names a local file
    fn local_file(&self, path: &str) -> Option<PathBuf> {
        Some(self.native(path)).filter(|native| native.is_file())
    }

    fn blob_exists(&self, path: &str) -> Result<bool> {
        let location = self.normalizer.locate(path);
        if location.is_container_root() {
            return Ok(false);
        }
        Ok(self.blobs.exists(&location.container.name, &location.key)?)
    }
}

impl FileOperations for HybridFiles {
    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.local_file(path).is_some() || self.blob_exists(path)?)
    }

    fn copy(&self, source: &str, dest: &str) -> Result<()> {
        if let Some(native) = self.local_file(source) {
            let target = self.native(dest);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| BackendError::io(dest, e))?;
            }
            std::fs::copy(native, &target)
                .map_err(|e| BackendError::io(source, e))?;
            return Ok(());
        }

        if !self.blob_exists(source)? {
            return Err(DirectoryError::NotFound(source.to_string()));
        }
        let from = self.normalizer.locate(source);
        let to = self.normalizer.locate(dest);
        self.blobs
            .copy(&from.container.name, &from.key, &to.container.name, &to.key)?;
        Ok(())
    }

    fn move_file(&self, source: &str, dest: &str) -> Result<()> {
        log::debug!("Moving file {} -> {}", source, dest);
        if let Some(native) = self.local_file(source) {
            let target = self.native(dest);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| BackendError::io(dest, e))?;
            }
            std::fs::rename(native, &target)
                .map_err(|e| BackendError::io(source, e))?;
            return Ok(());
        }

        self.copy(source, dest)?;
        self.delete(source)
    }

    fn delete(&self, path: &str) -> Result<()> {
        if let Some(native) = self.local_file(path) {
            std::fs::remove_file(native).map_err(|e| BackendError::io(path, e))?;
        }
        let location = self.normalizer.locate(path);
        if !location.is_container_root() {
            self.blobs.delete(&location.container.name, &location.key)?;
        }
        Ok(())
    }
}
