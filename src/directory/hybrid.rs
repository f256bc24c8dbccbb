//! Directories spanning the local filesystem and a blob store

use super::{
    CleanupFailure, CleanupTarget, DeleteReport, DirectoryMarker, DirectoryProvider,
    DirectorySnapshot, SearchScope, clean_mirrors, merge_unique,
};
use crate::blob::{BlobEntry, BlobStore};
use crate::clock::{Clock, SystemClock};
use crate::config::HybridConfig;
use crate::container::ContainerResolver;
use crate::error::{DirectoryError, Result};
use crate::path::{BlobLocation, LOCAL_SEPARATOR, PathNormalizer, join_local, leaf_name};
use crate::pattern::NamePattern;
use crate::storage::{FileOperations, HybridFiles, LocalDirectory};
use std::collections::HashSet;
use std::sync::Arc;

/// Directory provider merging the local filesystem with a blob store
///
/// The local filesystem is probed first and wins when it has the directory;
/// blob-backed directories are emulated from key prefixes plus a
/// [`DirectoryMarker`] for empty ones.
pub struct HybridDirectories {
    normalizer: PathNormalizer,
    blobs: Arc<dyn BlobStore>,
    files: Arc<dyn FileOperations>,
    clock: Arc<dyn Clock>,
    marker: DirectoryMarker,
    mirror_roots: Vec<String>,
}

impl HybridDirectories {
    pub fn new(
        config: &HybridConfig,
        resolver: Arc<dyn ContainerResolver>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        let normalizer = PathNormalizer::new(&config.local_root, resolver, config.max_path_length);
        let files = Arc::new(HybridFiles::new(normalizer.clone(), blobs.clone()));
        Self {
            normalizer,
            blobs,
            files,
            clock: Arc::new(SystemClock),
            marker: DirectoryMarker::new(config.marker_name.clone()),
            mirror_roots: config.mirror_roots.clone(),
        }
    }

    /// Use `clock` to stamp new directories
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use `files` for single-file moves
    pub fn with_files(mut self, files: Arc<dyn FileOperations>) -> Self {
        self.files = files;
        self
    }

    pub fn normalizer(&self) -> &PathNormalizer {
        &self.normalizer
    }

    pub fn marker(&self) -> &DirectoryMarker {
        &self.marker
    }

    fn local_dir(&self, canonical: &str) -> LocalDirectory {
        LocalDirectory::for_path(&self.normalizer, canonical)
    }

    fn blob_exists(&self, location: &BlobLocation) -> Result<bool> {
        if location.is_container_root() {
            return Ok(true);
        }
        Ok(self
            .blobs
            .any_with_prefix(&location.container.name, &location.prefix())?)
    }

    fn blob_files(&self, location: &BlobLocation, pattern: &NamePattern) -> Result<Vec<String>> {
        let entries = self
            .blobs
            .list(&location.container.name, &location.prefix(), true)?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| match entry {
                BlobEntry::Blob(item) => Some(item.key),
                BlobEntry::Prefix(_) => None,
            })
            .filter(|key| !self.marker.is_marker(key) && pattern.is_match(leaf_name(key)))
            .map(|key| self.normalizer.to_local_path(&location.container, &key))
            .collect())
    }

    /// Virtual subfolders directly under `location`
    fn blob_directories_this_level(
        &self,
        location: &BlobLocation,
        pattern: &NamePattern,
    ) -> Result<Vec<String>> {
        let entries = self
            .blobs
            .list(&location.container.name, &location.prefix(), true)?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| match entry {
                BlobEntry::Prefix(key) => Some(key),
                BlobEntry::Blob(_) => None,
            })
            .filter(|key| pattern.is_match(leaf_name(key)))
            .map(|key| self.normalizer.to_local_path(&location.container, &key))
            .collect())
    }

    /// Every directory below `location`, derived from a flat blob listing
    ///
    /// Flat listings carry no folders, so each blob's containing directory
    /// and its ancestors down to (but excluding) `location` are collected.
    fn blob_directories_all_levels(
        &self,
        location: &BlobLocation,
        pattern: &NamePattern,
    ) -> Result<Vec<String>> {
        let entries = self
            .blobs
            .list(&location.container.name, &location.prefix(), false)?;

        let mut seen = HashSet::new();
        let mut directories = Vec::new();
        for entry in entries {
            let mut dir = parent_key(entry.key());
            while let Some(current) = dir {
                if current.len() <= location.key.len() {
                    break;
                }
                if !seen.insert(current.to_lowercase()) {
                    break;
                }
                directories.push(current.to_string());
                dir = parent_key(current);
            }
        }

        Ok(directories
            .into_iter()
            .filter(|key| pattern.is_match(leaf_name(key)))
            .map(|key| self.normalizer.to_local_path(&location.container, &key))
            .collect())
    }

    fn local_paths(&self, paths: Vec<String>) -> Vec<String> {
        paths
            .into_iter()
            .map(|p| self.normalizer.to_canonical_local(&p, None))
            .collect()
    }

    fn delete_all_blobs(&self, location: &BlobLocation, report: &mut DeleteReport) -> Result<()> {
        let container = &location.container.name;
        let entries = self.blobs.list(container, &location.prefix(), false)?;
        for entry in entries {
            let key = entry.key();
            match self.blobs.delete(container, key) {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    log::warn!("Failed to delete blob {}:{}: {}", container, key, e);
                    report.failures.push(CleanupFailure {
                        target: CleanupTarget::Blob,
                        location: format!("{}:{}", container, key),
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn move_level(&self, source: &str, dest: &str, depth: usize) -> Result<()> {
        let source = self.normalizer.to_canonical_local(source, None);
        let dest = self.normalizer.to_canonical_local(dest, None);
        if source == dest {
            return Err(DirectoryError::SamePath(source));
        }
        let source = self.normalizer.validated(&source)?;
        let dest = self.normalizer.validated(&dest)?;
        if dest.starts_with(&format!("{}{}", source, LOCAL_SEPARATOR)) {
            return Err(DirectoryError::invalid_path(
                &dest,
                "destination is inside the source directory",
            ));
        }
        // Below the top level the destination may already hold the renamed local tree
        if depth == 0 && self.exists(&dest)? {
            return Err(DirectoryError::AlreadyExists(dest));
        }

        if !self.exists(&source)? {
            if self.files.exists(&source)? {
                log::debug!("{} is a file, moving it as one", source);
                return self.files.move_file(&source, &dest);
            }
            return Err(DirectoryError::NotFound(source));
        }

        log::debug!("Moving {} -> {} (depth {})", source, dest, depth);
        let local = self.local_dir(&source);
        if local.exists() {
            local.rename(&dest)?;
            log::debug!("Renamed local tree {} -> {}", source, dest);
        }

        // What is left under the source lives in blob storage only
        self.create_directory(&dest)?;

        for file in self.enumerate_files(&source, "*")? {
            let target = join_local(&dest, leaf_name(&file));
            self.files.move_file(&file, &target)?;
        }

        for sub in self.enumerate_directories(&source, "*", SearchScope::ThisLevelOnly)? {
            let target = join_local(&dest, leaf_name(&sub));
            self.move_level(&sub, &target, depth + 1)?;
        }

        if depth == 0 {
            let report = self.delete(&source, true)?;
            if !report.is_complete() {
                log::warn!(
                    "Moved {} but {} item(s) could not be removed from the source",
                    source,
                    report.failures.len()
                );
            }
            log::info!("Moved {} -> {}", source, dest);
        }

        Ok(())
    }
}

fn parent_key(key: &str) -> Option<&str> {
    key.rsplit_once('/').map(|(parent, _)| parent)
}

impl DirectoryProvider for HybridDirectories {
    fn canonical(&self, path: &str) -> String {
        self.normalizer.to_canonical_local(path, None)
    }

    fn exists(&self, path: &str) -> Result<bool> {
        let canonical = self.canonical(path);
        if self.local_dir(&canonical).exists() {
            return Ok(true);
        }
        self.blob_exists(&self.normalizer.locate(&canonical))
    }

    fn snapshot(&self, path: &str) -> Result<DirectorySnapshot> {
        let canonical = self.canonical(path);
        if let Some(times) = self.local_dir(&canonical).times() {
            return Ok(DirectorySnapshot::present(
                canonical,
                times.created,
                times.modified,
            ));
        }

        let location = self.normalizer.locate(&canonical);
        if location.is_container_root() {
            return Ok(DirectorySnapshot::present(canonical, None, None));
        }

        let entries = self
            .blobs
            .list(&location.container.name, &location.prefix(), false)?;
        let times = entries.iter().filter_map(|entry| match entry {
            BlobEntry::Blob(item) => Some(item.last_modified),
            BlobEntry::Prefix(_) => None,
        });
        let (created, last_write) = times.fold((None, None), |(min, max), t| {
            (
                Some(min.map_or(t, |m: std::time::SystemTime| m.min(t))),
                Some(max.map_or(t, |m: std::time::SystemTime| m.max(t))),
            )
        });

        if entries.is_empty() {
            Ok(DirectorySnapshot::missing(canonical))
        } else {
            Ok(DirectorySnapshot::present(canonical, created, last_write))
        }
    }

    fn create_directory(&self, path: &str) -> Result<DirectorySnapshot> {
        let canonical = self.normalizer.validated(path)?;
        if self.exists(&canonical)? {
            log::debug!("{} already exists", canonical);
            return self.snapshot(&canonical);
        }

        let location = self.normalizer.locate(&canonical);
        let marker = self.marker.key_for(&location);
        self.blobs.put(&location.container.name, &marker, &[])?;
        log::info!(
            "Created directory {} ({}:{})",
            canonical,
            location.container.name,
            marker
        );

        let now = self.clock.now();
        Ok(DirectorySnapshot::present(canonical, Some(now), Some(now)))
    }

    fn enumerate_files(&self, path: &str, pattern: &str) -> Result<Vec<String>> {
        let canonical = self.normalizer.validated(path)?;
        let location = self.normalizer.locate(&canonical);
        let pattern = NamePattern::new(pattern, location.container.case_sensitive)?;

        let local = self.local_paths(self.local_dir(&canonical).files(&pattern)?);
        let blob = self.blob_files(&location, &pattern)?;
        log::debug!(
            "{}: {} local and {} blob file(s) matching '{}'",
            canonical,
            local.len(),
            blob.len(),
            pattern
        );
        Ok(merge_unique(local, blob))
    }

    fn enumerate_directories(
        &self,
        path: &str,
        pattern: &str,
        scope: SearchScope,
    ) -> Result<Vec<String>> {
        let canonical = self.normalizer.validated(path)?;
        let location = self.normalizer.locate(&canonical);
        let pattern = NamePattern::new(pattern, location.container.case_sensitive)?;

        let recursive = scope == SearchScope::AllLevels;
        let local_dirs = self.local_dir(&canonical).directories(&pattern, recursive)?;
        let local = self.local_paths(local_dirs);
        let blob = match scope {
            SearchScope::ThisLevelOnly => self.blob_directories_this_level(&location, &pattern)?,
            SearchScope::AllLevels => self.blob_directories_all_levels(&location, &pattern)?,
        };
        Ok(merge_unique(local, blob))
    }

    fn delete(&self, path: &str, recursive: bool) -> Result<DeleteReport> {
        let canonical = self.normalizer.validated(path)?;
        let mut report = DeleteReport::default();
        if !self.exists(&canonical)? {
            log::debug!("{} does not exist, nothing to delete", canonical);
            return Ok(report);
        }

        let location = self.normalizer.locate(&canonical);
        let local = self.local_dir(&canonical);

        if !recursive {
            let has_files = !self.enumerate_files(&canonical, "*")?.is_empty();
            let has_dirs = !self
                .enumerate_directories(&canonical, "*", SearchScope::ThisLevelOnly)?
                .is_empty();
            if has_files || has_dirs {
                return Err(DirectoryError::NotEmpty(canonical));
            }
            let marker = self.marker.key_for(&location);
            if !location.is_container_root()
                && self.blobs.exists(&location.container.name, &marker)?
            {
                self.blobs.delete(&location.container.name, &marker)?;
                report.deleted += 1;
            }
            if local.exists() {
                local.remove(false)?;
                report.deleted += 1;
            }
            log::info!("Deleted directory {}", canonical);
            return Ok(report);
        }

        self.delete_all_blobs(&location, &mut report)?;
        if local.exists() {
            local.remove(true)?;
            report.deleted += 1;
        }
        clean_mirrors(&self.normalizer, &self.mirror_roots, &canonical, &mut report);

        log::info!(
            "Deleted directory tree {} ({} removed, {} failure(s))",
            canonical,
            report.deleted,
            report.failures.len()
        );
        Ok(report)
    }

    fn move_directory(&self, source: &str, dest: &str) -> Result<()> {
        self.move_level(source, dest, 0)
    }
}
