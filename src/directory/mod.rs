//! Directory emulation over the local filesystem and a blob store
//!
//! [`DirectoryProvider`] is the capability set (exists, create, delete, move,
//! enumerate). It has two implementations:
//! - [`HybridDirectories`] merges the local filesystem with a blob store
//! - [`LocalDirectories`] only uses the local filesystem
//!
//! [`Directories`] is the cloneable facade callers hold, and
//! [`DirectoryHandle`] is a snapshot of a single directory.

mod handle;
mod hybrid;
mod local;
mod marker;
mod provider;

pub use handle::DirectoryHandle;
pub use hybrid::HybridDirectories;
pub use local::LocalDirectories;
pub use marker::DirectoryMarker;
pub use provider::{Directories, DirectoryProvider};

use crate::path::{PathNormalizer, join_local, to_backslashes};
use crate::storage::LocalDirectory;
use serde::Serialize;
use std::collections::HashSet;
use std::time::SystemTime;

/// How deep a directory enumeration goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SearchScope {
    /// Direct children only
    #[default]
    ThisLevelOnly,
    /// Every descendant
    AllLevels,
}

/// Point-in-time view of one directory
///
/// Snapshots are not live: they reflect the backends at the moment they were
/// taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectorySnapshot {
    /// Canonical local path
    pub full_name: String,
    /// Last path segment
    pub name: String,
    pub created: Option<SystemTime>,
    pub last_write: Option<SystemTime>,
    pub exists: bool,
}

impl DirectorySnapshot {
    pub(crate) fn missing(full_name: String) -> Self {
        let name = crate::path::leaf_name(&full_name).to_string();
        Self {
            full_name,
            name,
            created: None,
            last_write: None,
            exists: false,
        }
    }

    pub(crate) fn present(
        full_name: String,
        created: Option<SystemTime>,
        last_write: Option<SystemTime>,
    ) -> Self {
        Self {
            created,
            last_write,
            exists: true,
            ..Self::missing(full_name)
        }
    }
}

/// What a best-effort cleanup step failed to remove
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CleanupTarget {
    Blob,
    Mirror,
}

/// One swallowed failure during a delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupFailure {
    pub target: CleanupTarget,
    /// Blob key (`container:key`) or mirror path
    pub location: String,
    pub message: String,
}

/// Outcome of a delete
///
/// Recursive deletes are best effort: individual blob deletions and mirror
/// cleanups that fail are recorded in `failures` instead of aborting the
/// operation, so a successful delete does not guarantee that every byte is
/// gone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    /// Blobs and local directories removed
    pub deleted: usize,
    pub failures: Vec<CleanupFailure>,
}

impl DeleteReport {
    /// True when nothing was left behind
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn merge(&mut self, other: DeleteReport) {
        self.deleted += other.deleted;
        self.failures.extend(other.failures);
    }
}

/// Remove temp/cache copies of `canonical` under each mirror root
///
/// Failures are logged and recorded, never returned.
pub(crate) fn clean_mirrors(
    normalizer: &PathNormalizer,
    mirror_roots: &[String],
    canonical: &str,
    report: &mut DeleteReport,
) {
    let relative = normalizer.relative_local(canonical);
    if relative.is_empty() {
        return;
    }
    for root in mirror_roots {
        let mirror = join_local(&to_backslashes(root), &relative);
        let dir = LocalDirectory::new(&mirror);
        if !dir.exists() {
            continue;
        }
        match dir.remove(true) {
            Ok(()) => {
                log::debug!("Removed mirror {}", mirror);
                report.deleted += 1;
            }
            Err(e) => {
                log::warn!("Failed to remove mirror {}: {}", mirror, e);
                report.failures.push(CleanupFailure {
                    target: CleanupTarget::Mirror,
                    location: mirror,
                    message: e.to_string(),
                });
            }
        }
    }
}

/// Union of two listings without duplicates, first occurrence wins
pub(crate) fn merge_unique(first: Vec<String>, second: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(first.len() + second.len());
    first
        .into_iter()
        .chain(second)
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_unique() {
        let merged = merge_unique(
            vec!["a".to_string(), "b".to_string()],
            vec!["b".to_string(), "c".to_string(), "a".to_string()],
        );
        assert_eq!(merged, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_report_merge() {
        let mut report = DeleteReport {
            deleted: 2,
            failures: Vec::new(),
        };
        report.merge(DeleteReport {
            deleted: 1,
            failures: vec![CleanupFailure {
                target: CleanupTarget::Blob,
                location: "site:a/b".to_string(),
                message: "boom".to_string(),
            }],
        });
        assert_eq!(report.deleted, 3);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_snapshot_name() {
        let snapshot = DirectorySnapshot::present("\\srv\\site\\media".to_string(), None, None);
        assert_eq!(snapshot.name, "media");
        assert!(snapshot.exists);
    }
}
