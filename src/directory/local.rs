//! Directories on the local filesystem only

use super::{
    DeleteReport, DirectoryProvider, DirectorySnapshot, SearchScope, clean_mirrors,
};
use crate::clock::{Clock, SystemClock};
use crate::config::HybridConfig;
use crate::container::ContainerResolver;
use crate::error::{BackendError, DirectoryError, Result};
use crate::path::{LOCAL_SEPARATOR, PathNormalizer};
use crate::pattern::NamePattern;
use crate::storage::{LocalDirectory, file_exists, resolve_native};
use std::sync::Arc;

/// Directory provider for trees that live entirely on the local filesystem
pub struct LocalDirectories {
    normalizer: PathNormalizer,
    clock: Arc<dyn Clock>,
    mirror_roots: Vec<String>,
}

impl LocalDirectories {
    pub fn new(config: &HybridConfig, resolver: Arc<dyn ContainerResolver>) -> Self {
        Self {
            normalizer: PathNormalizer::new(&config.local_root, resolver, config.max_path_length),
            clock: Arc::new(SystemClock),
            mirror_roots: config.mirror_roots.clone(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn local_paths(&self, paths: Vec<String>) -> Vec<String> {
        paths
            .into_iter()
            .map(|p| self.normalizer.to_canonical_local(&p, None))
            .collect()
    }

    fn local_dir(&self, canonical: &str) -> LocalDirectory {
        LocalDirectory::for_path(&self.normalizer, canonical)
    }

    fn case_sensitive(&self, canonical: &str) -> bool {
        self.normalizer.resolve(canonical).case_sensitive
    }

    fn pattern_for(&self, canonical: &str, pattern: &str) -> Result<NamePattern> {
        NamePattern::new(pattern, self.normalizer.resolve(canonical).case_sensitive)
    }
}

impl DirectoryProvider for LocalDirectories {
    fn canonical(&self, path: &str) -> String {
        self.normalizer.to_canonical_local(path, None)
    }

    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.local_dir(&self.canonical(path)).exists())
    }

    fn snapshot(&self, path: &str) -> Result<DirectorySnapshot> {
        let canonical = self.canonical(path);
        Ok(match self.local_dir(&canonical).times() {
            Some(times) => DirectorySnapshot::present(canonical, times.created, times.modified),
            None => DirectorySnapshot::missing(canonical),
        })
    }

    fn create_directory(&self, path: &str) -> Result<DirectorySnapshot> {
        let canonical = self.normalizer.validated(path)?;
        let dir = self.local_dir(&canonical);
        if dir.exists() {
            return self.snapshot(&canonical);
        }
        dir.create()?;
        log::info!("Created directory {}", canonical);
        let now = self.clock.now();
        Ok(DirectorySnapshot::present(canonical, Some(now), Some(now)))
    }

    fn enumerate_files(&self, path: &str, pattern: &str) -> Result<Vec<String>> {
        let canonical = self.normalizer.validated(path)?;
        let pattern = self.pattern_for(&canonical, pattern)?;
        Ok(self.local_paths(self.local_dir(&canonical).files(&pattern)?))
    }

    fn enumerate_directories(
        &self,
        path: &str,
        pattern: &str,
        scope: SearchScope,
    ) -> Result<Vec<String>> {
        let canonical = self.normalizer.validated(path)?;
        let pattern = self.pattern_for(&canonical, pattern)?;
        let recursive = scope == SearchScope::AllLevels;
        Ok(self.local_paths(self.local_dir(&canonical).directories(&pattern, recursive)?))
    }

    fn delete(&self, path: &str, recursive: bool) -> Result<DeleteReport> {
        let canonical = self.normalizer.validated(path)?;
        let dir = self.local_dir(&canonical);
        let mut report = DeleteReport::default();
        if !dir.exists() {
            return Ok(report);
        }

        if !recursive {
            let any = NamePattern::any();
            if !dir.files(&any)?.is_empty() || !dir.directories(&any, false)?.is_empty() {
                return Err(DirectoryError::NotEmpty(canonical));
            }
        }

        dir.remove(recursive)?;
        report.deleted += 1;
        if recursive {
            clean_mirrors(&self.normalizer, &self.mirror_roots, &canonical, &mut report);
        }
        log::info!("Deleted directory {}", canonical);
        Ok(report)
    }

    fn move_directory(&self, source: &str, dest: &str) -> Result<()> {
        let source = self.canonical(source);
        let dest = self.canonical(dest);
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
        if resolve_native(&dest, self.case_sensitive(&dest)).exists() {
            return Err(DirectoryError::AlreadyExists(dest));
        }

        let dir = self.local_dir(&source);
        if dir.exists() {
            dir.rename(&dest)?;
        } else if file_exists(&source, self.case_sensitive(&source)) {
            std::fs::rename(
                resolve_native(&source, self.case_sensitive(&source)),
                resolve_native(&dest, self.case_sensitive(&dest)),
            )
            .map_err(|e| BackendError::io(&source, e))?;
        } else {
            return Err(DirectoryError::NotFound(source));
        }
        log::info!("Moved {} -> {}", source, dest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::RoutingTable;
    use tempfile::TempDir;

    fn provider(temp: &TempDir) -> LocalDirectories {
        let config = HybridConfig::with_local_root(temp.path().display().to_string());
        LocalDirectories::new(&config, Arc::new(RoutingTable::default()))
    }

    #[test]
    fn test_create_enumerate_delete() {
        let temp = TempDir::new().unwrap();
        let dirs = provider(&temp);

        let created = dirs.create_directory("docs/guides").unwrap();
        assert!(created.exists);
        assert!(temp.path().join("docs/guides").is_dir());
        assert!(dirs.exists("docs").unwrap());

        std::fs::write(temp.path().join("docs/index.md"), "#").unwrap();
        assert_eq!(dirs.enumerate_files("docs", "*.md").unwrap().len(), 1);
        assert_eq!(
            dirs.enumerate_directories("docs", "*", SearchScope::ThisLevelOnly)
                .unwrap()
                .len(),
            1
        );

        assert!(matches!(
            dirs.delete("docs", false),
            Err(DirectoryError::NotEmpty(_))
        ));
        dirs.delete("docs", true).unwrap();
        assert!(!temp.path().join("docs").exists());
    }

    #[test]
    fn test_move() {
        let temp = TempDir::new().unwrap();
        let dirs = provider(&temp);
        dirs.create_directory("a/b").unwrap();
        std::fs::write(temp.path().join("a/b/file.txt"), "x").unwrap();

        dirs.move_directory("a", "c").unwrap();
        assert!(temp.path().join("c/b/file.txt").is_file());
        assert!(!dirs.exists("a").unwrap());

        assert!(matches!(
            dirs.move_directory("missing", "d"),
            Err(DirectoryError::NotFound(_))
        ));
    }

    #[test]
    fn test_mixed_case_local_entries() {
        let temp = TempDir::new().unwrap();
        let dirs = provider(&temp);
        std::fs::create_dir_all(temp.path().join("Archive/Year2024")).unwrap();

        assert!(dirs.exists("Archive").unwrap());
        let listed = dirs
            .enumerate_directories("archive", "*", SearchScope::ThisLevelOnly)
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert!(dirs.exists(&listed[0]).unwrap());

        dirs.move_directory("archive", "moved").unwrap();
        assert!(temp.path().join("moved/Year2024").is_dir());
        assert!(!temp.path().join("Archive").exists());
    }
}
