//! Local filesystem access for canonical paths
//!
//! Canonical paths are `\`-separated and case-folded below the local root
//! unless the owning container is case-sensitive. [`resolve_native`] turns
//! them back into the path that is actually on disk before any I/O happens.

use crate::error::{BackendError, Result};
use crate::path::{PathNormalizer, join_local};
use crate::pattern::NamePattern;
use std::ffi::{OsStr, OsString};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

/// Host path for a canonical local path, segments taken verbatim
pub fn native_path(canonical: &str) -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(canonical)
    } else {
        PathBuf::from(canonical.replace('\\', "/"))
    }
}

/// Host path for a canonical local path, matched against the names on disk
///
/// A path that exists verbatim is returned as is. Otherwise, unless
/// `case_sensitive`, each segment is swapped for the sibling whose name folds
/// to the same lower-case string. Segments with no match on disk are kept as
/// given so the path can still be created.
pub fn resolve_native(canonical: &str, case_sensitive: bool) -> PathBuf {
    let exact = native_path(canonical);
    if case_sensitive || exact.exists() {
        return exact;
    }

    let mut resolved = PathBuf::new();
    let mut components = exact.components();
    while let Some(component) = components.next() {
        let Component::Normal(name) = component else {
            resolved.push(component);
            continue;
        };
        let candidate = resolved.join(name);
        if candidate.exists() {
            resolved = candidate;
            continue;
        }
        match find_folded(&resolved, name) {
            Some(actual) => resolved.push(actual),
            None => {
                resolved.push(name);
                resolved.extend(components.by_ref());
                break;
            }
        }
    }
    resolved
}

fn find_folded(dir: &Path, name: &OsStr) -> Option<OsString> {
    let wanted = name.to_str()?.to_lowercase();
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name())
        .find(|found| found.to_str().is_some_and(|n| n.to_lowercase() == wanted))
}

/// Creation and last-write times of a local entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTimes {
    pub created: Option<SystemTime>,
    pub modified: Option<SystemTime>,
}

/// One local directory addressed by its canonical path
///
/// Names are matched case-insensitively against the disk unless the
/// directory is marked case-sensitive.
#[derive(Debug, Clone)]
pub struct LocalDirectory {
    path: String,
    case_sensitive: bool,
}

impl LocalDirectory {
    pub fn new(canonical: impl Into<String>) -> Self {
        Self {
            path: canonical.into(),
            case_sensitive: false,
        }
    }

    /// Directory at `canonical` with the case policy of its owning container
    pub fn for_path(normalizer: &PathNormalizer, canonical: &str) -> Self {
        Self::new(canonical).case_sensitive(normalizer.resolve(canonical).case_sensitive)
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path on disk for this directory
    pub fn native(&self) -> PathBuf {
        resolve_native(&self.path, self.case_sensitive)
    }

    pub fn exists(&self) -> bool {
        self.native().is_dir()
    }

    /// Timestamps, or `None` when the directory does not exist
    pub fn times(&self) -> Option<LocalTimes> {
        let metadata = std::fs::metadata(self.native()).ok()?;
        if !metadata.is_dir() {
            return None;
        }
        Some(LocalTimes {
            created: metadata.created().ok(),
            modified: metadata.modified().ok(),
        })
    }

    /// Files directly in this directory whose name matches `pattern`
    ///
    /// Returns this directory's path joined with each name as found on disk. A missing
    /// directory yields an empty list.
    pub fn files(&self, pattern: &NamePattern) -> Result<Vec<String>> {
        self.entries(pattern, false)
    }

    /// Subdirectories matching `pattern`, optionally at every depth
    pub fn directories(&self, pattern: &NamePattern, recursive: bool) -> Result<Vec<String>> {
        let mut found = Vec::new();
        let mut pending = vec![self.path.clone()];

        while let Some(dir) = pending.pop() {
            let all = LocalDirectory::new(dir)
                .case_sensitive(self.case_sensitive)
                .entries(&NamePattern::any(), true)?;
            for sub in all {
                if pattern.is_match(crate::path::leaf_name(&sub)) {
                    found.push(sub.clone());
                }
                if recursive {
                    pending.push(sub);
                }
            }
        }

        Ok(found)
    }

    fn entries(&self, pattern: &NamePattern, want_dirs: bool) -> Result<Vec<String>> {
        let native = self.native();
        if !native.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let read = std::fs::read_dir(&native).map_err(|e| BackendError::io(&self.path, e))?;
        for entry in read {
            let entry = entry.map_err(|e| BackendError::io(&self.path, e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| BackendError::io(&self.path, e))?;
            if file_type.is_dir() != want_dirs {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                log::debug!("Skipping non UTF-8 entry in {}", self.path);
                continue;
            };
            if pattern.is_match(&name) {
                entries.push(join_local(&self.path, &name));
            }
        }

        Ok(entries)
    }

    /// Create this directory and any missing parents
    pub fn create(&self) -> Result<()> {
        std::fs::create_dir_all(self.native())
            .map_err(|e| BackendError::io(&self.path, e))?;
        Ok(())
    }

    /// Remove this directory; a missing directory is not an error
    pub fn remove(&self, recursive: bool) -> Result<()> {
        let native = self.native();
        let result = if recursive {
            std::fs::remove_dir_all(&native)
        } else {
            std::fs::remove_dir(&native)
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BackendError::io(&self.path, e).into()),
        }
    }

    /// Rename this directory to `dest`, creating the destination's parents
    pub fn rename(&self, dest: &str) -> Result<()> {
        let target = resolve_native(dest, self.case_sensitive);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BackendError::io(dest, e))?;
        }
        std::fs::rename(self.native(), &target)
            .map_err(|e| BackendError::io(&self.path, e))?;
        Ok(())
    }
}

/// Check whether a canonical path names a local file
pub fn file_exists(canonical: &str, case_sensitive: bool) -> bool {
    resolve_native(canonical, case_sensitive).is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn canonical(temp: &TempDir) -> String {
        crate::path::to_backslashes(&temp.path().display().to_string())
    }

    #[test]
    fn test_files_and_directories() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("a/b")).unwrap();
        std::fs::create_dir_all(temp.path().join("c")).unwrap();
        std::fs::write(temp.path().join("one.txt"), "1").unwrap();
        std::fs::write(temp.path().join("two.jpg"), "2").unwrap();

        let root = canonical(&temp);
        let dir = LocalDirectory::new(&root);
        assert!(dir.exists());
        assert!(dir.times().is_some());

        let txt = dir.files(&NamePattern::new("*.txt", false).unwrap()).unwrap();
        assert_eq!(txt, vec![join_local(&root, "one.txt")]);
        assert_eq!(dir.files(&NamePattern::any()).unwrap().len(), 2);

        let mut shallow = dir.directories(&NamePattern::any(), false).unwrap();
        shallow.sort();
        assert_eq!(shallow, vec![join_local(&root, "a"), join_local(&root, "c")]);

        let deep = dir.directories(&NamePattern::any(), true).unwrap();
        assert_eq!(deep.len(), 3);
        assert!(deep.contains(&join_local(&join_local(&root, "a"), "b")));
    }

    #[test]
    fn test_missing_directory() {
        let temp = TempDir::new().unwrap();
        let dir = LocalDirectory::new(join_local(&canonical(&temp), "missing"));
        assert!(!dir.exists());
        assert!(dir.times().is_none());
        assert!(dir.files(&NamePattern::any()).unwrap().is_empty());
        dir.remove(true).unwrap();
    }

    #[test]
    fn test_create_rename_remove() {
        let temp = TempDir::new().unwrap();
        let root = canonical(&temp);
        let dir = LocalDirectory::new(join_local(&root, "x\\y"));
        dir.create().unwrap();
        assert!(temp.path().join("x/y").is_dir());

        dir.rename(&join_local(&root, "z\\y")).unwrap();
        assert!(temp.path().join("z/y").is_dir());
        assert!(!temp.path().join("x/y").exists());

        let x = LocalDirectory::new(join_local(&root, "x"));
        x.remove(false).unwrap();
        assert!(!x.exists());
    }

    #[test]
    fn test_folded_path_finds_mixed_case_entries() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("Media/Images")).unwrap();
        std::fs::write(temp.path().join("Media/Images/Photo.JPG"), "p").unwrap();
        let root = canonical(&temp);

        let images = LocalDirectory::new(join_local(&root, "media\\images"));
        assert!(images.exists());
        assert_eq!(images.native(), temp.path().join("Media/Images"));
        assert!(file_exists(&join_local(&root, "media\\images\\photo.jpg"), false));

        let listed = images.files(&NamePattern::any()).unwrap();
        assert_eq!(listed, vec![join_local(&root, "media\\images\\Photo.JPG")]);

        let strict = LocalDirectory::new(join_local(&root, "media\\images")).case_sensitive(true);
        assert!(!strict.exists());
        assert!(!file_exists(&join_local(&root, "media\\images\\photo.jpg"), true));
    }

    #[test]
    fn test_missing_segments_are_kept_for_creation() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("Docs")).unwrap();
        let root = canonical(&temp);

        let resolved = resolve_native(&join_local(&root, "docs\\new\\deeper"), false);
        assert_eq!(resolved, temp.path().join("Docs/new/deeper"));

        LocalDirectory::new(join_local(&root, "docs\\new")).create().unwrap();
        assert!(temp.path().join("Docs/new").is_dir());
    }
}
