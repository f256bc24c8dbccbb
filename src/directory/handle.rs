//! Per-directory handle

use super::{DeleteReport, Directories, DirectorySnapshot, SearchScope};
use crate::error::Result;
use crate::path::parent_path;
use std::time::SystemTime;

/// A snapshot of one directory plus the operations scoped to it
///
/// The attributes are captured when the handle is built and are not kept in
/// sync with the backends. Call [`DirectoryHandle::refresh`] to re-probe.
#[derive(Debug, Clone)]
pub struct DirectoryHandle {
    directories: Directories,
    snapshot: DirectorySnapshot,
}

impl DirectoryHandle {
    pub(crate) fn new(directories: Directories, snapshot: DirectorySnapshot) -> Self {
        Self {
            directories,
            snapshot,
        }
    }

    /// Canonical local path
    pub fn full_name(&self) -> &str {
        &self.snapshot.full_name
    }

    pub fn name(&self) -> &str {
        &self.snapshot.name
    }

    pub fn creation_time(&self) -> Option<SystemTime> {
        self.snapshot.created
    }

    pub fn last_write_time(&self) -> Option<SystemTime> {
        self.snapshot.last_write
    }

    pub fn exists(&self) -> bool {
        self.snapshot.exists
    }

    pub fn snapshot(&self) -> &DirectorySnapshot {
        &self.snapshot
    }

    /// Handle for the parent directory, one level up by path truncation
    ///
    /// Returns `None` at the top of the tree.
    pub fn parent(&self) -> Result<Option<DirectoryHandle>> {
        match parent_path(self.full_name()) {
            Some(parent) => self.directories.open(&parent).map(Some),
            None => Ok(None),
        }
    }

    /// Re-probe the backends and replace the snapshot
    pub fn refresh(&mut self) -> Result<()> {
        self.snapshot = self.directories.provider().snapshot(self.full_name())?;
        Ok(())
    }

    /// Create this directory if needed and take the resulting snapshot
    pub fn create(&mut self) -> Result<()> {
        self.snapshot = self
            .directories
            .provider()
            .create_directory(self.full_name())?;
        Ok(())
    }

    /// Create a subdirectory of this directory
    pub fn create_subdirectory(&self, name: &str) -> Result<DirectoryHandle> {
        self.directories
            .create_directory(&crate::path::join_local(self.full_name(), name))
    }

    pub fn enumerate_files(&self, pattern: &str) -> Result<Vec<String>> {
        self.directories.enumerate_files(self.full_name(), pattern)
    }

    pub fn enumerate_directories(&self, pattern: &str, scope: SearchScope) -> Result<Vec<String>> {
        self.directories
            .enumerate_directories(self.full_name(), pattern, scope)
    }

    /// Handles for the direct subdirectories
    pub fn subdirectories(&self) -> Result<Vec<DirectoryHandle>> {
        self.enumerate_directories("*", SearchScope::ThisLevelOnly)?
            .iter()
            .map(|path| self.directories.open(path))
            .collect()
    }

    /// Delete this directory
    ///
    /// A recursive delete removes each subdirectory through a recursive
    /// directory delete before clearing what is left at this level. The
    /// snapshot is marked as gone afterwards.
    pub fn delete(&mut self, recursive: bool) -> Result<DeleteReport> {
        let mut report = DeleteReport::default();
        if recursive {
            for sub in self.enumerate_directories("*", SearchScope::ThisLevelOnly)? {
                report.merge(self.directories.delete(&sub, true)?);
            }
        }
        report.merge(self.directories.delete(self.full_name(), recursive)?);
        self.snapshot.exists = false;
        Ok(report)
    }

    /// Move this directory to `dest` and return a handle for the new location
    pub fn move_to(&self, dest: &str) -> Result<DirectoryHandle> {
        self.directories.move_directory(self.full_name(), dest)?;
        self.directories.open(dest)
    }
}
