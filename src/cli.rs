//! CLI helper functions

use crate::{
    blob::DirectoryBlobStore,
    config::HybridConfig,
    container::{ContainerResolver, RoutingTable},
    directory::{DeleteReport, Directories, DirectorySnapshot, SearchScope},
    path::PathNormalizer,
};
use eyre::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Load the hybrid configuration
///
/// Reads the YAML file when it exists and falls back to defaults otherwise.
/// Environment overrides are applied last:
/// - HYBRID_LOCAL_ROOT: application local root
/// - HYBRID_BLOB_ROOT: on-disk blob store root
/// - HYBRID_MODE: `hybrid` or `local`
/// - HYBRID_MARKER_NAME: directory marker leaf name
pub fn load_config(config_path: impl AsRef<Path>) -> Result<HybridConfig> {
    let config_path = config_path.as_ref();
    let config = HybridConfig::load(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    log::debug!(
        "Config loaded: mode={}, local_root={}, blob_root={}, {} container(s)",
        config.mode,
        config.local_root,
        config.blob_root,
        config.containers.len()
    );
    Ok(config)
}

/// Build the directory facade with an on-disk blob store rooted at `blob_root`
pub fn build_directories(config: &HybridConfig) -> Directories {
    let blobs = Arc::new(DirectoryBlobStore::new(&config.blob_root));
    Directories::from_config(config, blobs)
}

/// Options for [`list_entries`]
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub pattern: Option<String>,
    pub directories: bool,
    pub all_levels: bool,
}

/// Check whether a directory exists in any backend
pub fn check_exists(directories: &Directories, path: &str) -> Result<bool> {
    let canonical = directories.canonical(path);
    let exists = directories
        .exists(path)
        .with_context(|| format!("Failed to probe {}", canonical))?;
    log::debug!("{} exists: {}", canonical, exists);
    Ok(exists)
}

/// Create a directory and return its snapshot
pub fn make_directory(directories: &Directories, path: &str) -> Result<DirectorySnapshot> {
    let handle = directories
        .create_directory(path)
        .with_context(|| format!("Failed to create directory {}", path))?;
    log::info!("✓ Directory ready at {}", handle.full_name());
    Ok(handle.snapshot().clone())
}

/// List files, or subdirectories with `options.directories`, under `path`
///
/// The result is sorted for stable output.
pub fn list_entries(
    directories: &Directories,
    path: &str,
    options: &ListOptions,
) -> Result<Vec<String>> {
    let pattern = options.pattern.as_deref().unwrap_or("*");
    let mut entries = if options.directories {
        let scope = match options.all_levels {
            true => SearchScope::AllLevels,
            false => SearchScope::ThisLevelOnly,
        };
        directories.enumerate_directories(path, pattern, scope)?
    } else {
        if options.all_levels {
            log::warn!("--all-levels only applies to directory listings, ignoring");
        }
        directories.enumerate_files(path, pattern)?
    };
    entries.sort();
    log::debug!("Listed {} entr(ies) under {}", entries.len(), path);
    Ok(entries)
}

/// Delete a directory
///
/// The returned report lists every cleanup step that failed; the delete
/// itself still counts as done.
pub fn remove_directory(directories: &Directories, path: &str, recursive: bool) -> Result<DeleteReport> {
    let mut handle = directories.open(path)?;
    if !handle.exists() {
        log::warn!("{} does not exist, nothing to delete", handle.full_name());
        return Ok(DeleteReport::default());
    }

    let report = handle
        .delete(recursive)
        .with_context(|| format!("Failed to delete {}", handle.full_name()))?;
    if report.is_complete() {
        log::info!("✓ Deleted {} ({} item(s))", handle.full_name(), report.deleted);
    } else {
        log::warn!(
            "Deleted {} with {} cleanup failure(s)",
            handle.full_name(),
            report.failures.len()
        );
    }
    Ok(report)
}

/// Move a directory tree or a single file
pub fn move_entry(directories: &Directories, source: &str, dest: &str) -> Result<String> {
    directories
        .move_directory(source, dest)
        .with_context(|| format!("Failed to move {} to {}", source, dest))?;
    let dest = directories.canonical(dest);
    log::info!("✓ Moved {} -> {}", directories.canonical(source), dest);
    Ok(dest)
}

/// Current snapshot of a directory
pub fn describe(directories: &Directories, path: &str) -> Result<DirectorySnapshot> {
    let handle = directories.open(path)?;
    Ok(handle.snapshot().clone())
}

/// Where a logical path lands in both backends
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyInfo {
    pub local_path: String,
    pub container: String,
    pub key: String,
    pub case_sensitive: bool,
}

/// Resolve the canonical local path, owning container and blob key for `path`
pub fn locate_key(config: &HybridConfig, path: &str) -> KeyInfo {
    let resolver: Arc<dyn ContainerResolver> = Arc::new(RoutingTable::new(
        config.default_container.clone(),
        config.containers.clone(),
    ));
    let normalizer = PathNormalizer::new(&config.local_root, resolver, config.max_path_length);
    let location = normalizer.locate(path);
    KeyInfo {
        local_path: normalizer.to_canonical_local(path, None),
        container: location.container.name.clone(),
        key: location.key,
        case_sensitive: location.container.case_sensitive,
    }
}
