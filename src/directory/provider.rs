//! Directory capability trait and the facade callers hold

use super::{
    DeleteReport, DirectoryHandle, DirectorySnapshot, HybridDirectories, LocalDirectories,
    SearchScope,
};
use crate::blob::BlobStore;
use crate::config::{HybridConfig, ProviderMode};
use crate::container::{ContainerResolver, RoutingTable};
use crate::error::Result;
use std::sync::Arc;

/// Directory operations over one storage arrangement
///
/// Paths may be relative to the local root or absolute, with either
/// separator. Every call blocks until the backends answer.
///
/// Nothing here is atomic across callers. Two callers can both see a
/// directory as missing and both create it, and a delete can race with a
/// create; the last write wins.
pub trait DirectoryProvider: Send + Sync {
    /// Canonical local form of `path`
    fn canonical(&self, path: &str) -> String;

    /// True if `path` exists as a directory in any backend
    fn exists(&self, path: &str) -> Result<bool>;

    /// Probe the backends for the current state of `path`
    fn snapshot(&self, path: &str) -> Result<DirectorySnapshot>;

    /// Create `path`; an existing directory is returned unchanged
    fn create_directory(&self, path: &str) -> Result<DirectorySnapshot>;

    /// Files directly in `path` whose name matches the glob `pattern`
    ///
    /// Order is unspecified.
    fn enumerate_files(&self, path: &str, pattern: &str) -> Result<Vec<String>>;

    /// Subdirectories of `path` whose name matches the glob `pattern`
    ///
    /// Order is unspecified.
    fn enumerate_directories(
        &self,
        path: &str,
        pattern: &str,
        scope: SearchScope,
    ) -> Result<Vec<String>>;

    /// Delete `path`
    ///
    /// A shallow delete fails with `NotEmpty` when the directory has files or
    /// subdirectories. A recursive delete is best effort, see [`DeleteReport`].
    fn delete(&self, path: &str, recursive: bool) -> Result<DeleteReport>;

    /// Move a directory tree, or a single file, from `source` to `dest`
    ///
    /// Local directories are renamed, so they stay local and keep the names
    /// they have on disk. Blob content is copied and then deleted level by
    /// level. There is no rollback: a failure part way through leaves both
    /// trees partially populated.
    fn move_directory(&self, source: &str, dest: &str) -> Result<()>;
}

/// Cloneable entry point over a [`DirectoryProvider`]
#[derive(Clone)]
pub struct Directories {
    provider: Arc<dyn DirectoryProvider>,
}

impl std::fmt::Debug for Directories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directories").finish_non_exhaustive()
    }
}

impl Directories {
    pub fn new(provider: Arc<dyn DirectoryProvider>) -> Self {
        Self { provider }
    }

    /// Build the provider selected by `config.mode`
    ///
    /// The blob store is ignored in local mode.
    pub fn from_config(config: &HybridConfig, blobs: Arc<dyn BlobStore>) -> Self {
        let resolver: Arc<dyn ContainerResolver> = Arc::new(RoutingTable::new(
            config.default_container.clone(),
            config.containers.clone(),
        ));
        log::debug!(
            "Building {} directory provider rooted at {}",
            config.mode,
            config.local_root
        );
        let provider: Arc<dyn DirectoryProvider> = match config.mode {
            ProviderMode::Hybrid => Arc::new(HybridDirectories::new(config, resolver, blobs)),
            ProviderMode::Local => Arc::new(LocalDirectories::new(config, resolver)),
        };
        Self::new(provider)
    }

    pub fn provider(&self) -> &dyn DirectoryProvider {
        self.provider.as_ref()
    }

    pub fn canonical(&self, path: &str) -> String {
        self.provider.canonical(path)
    }

    pub fn exists(&self, path: &str) -> Result<bool> {
        self.provider.exists(path)
    }

    /// Handle for `path`, whether or not it exists
    pub fn open(&self, path: &str) -> Result<DirectoryHandle> {
        let snapshot = self.provider.snapshot(path)?;
        Ok(DirectoryHandle::new(self.clone(), snapshot))
    }

    pub fn create_directory(&self, path: &str) -> Result<DirectoryHandle> {
        let snapshot = self.provider.create_directory(path)?;
        Ok(DirectoryHandle::new(self.clone(), snapshot))
    }

    pub fn enumerate_files(&self, path: &str, pattern: &str) -> Result<Vec<String>> {
        self.provider.enumerate_files(path, pattern)
    }

    pub fn enumerate_directories(
        &self,
        path: &str,
        pattern: &str,
        scope: SearchScope,
    ) -> Result<Vec<String>> {
        self.provider.enumerate_directories(path, pattern, scope)
    }

    pub fn delete(&self, path: &str, recursive: bool) -> Result<DeleteReport> {
        self.provider.delete(path, recursive)
    }

    pub fn move_directory(&self, source: &str, dest: &str) -> Result<()> {
        self.provider.move_directory(source, dest)
    }
}
