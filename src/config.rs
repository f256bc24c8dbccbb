//! Hybrid directory configuration
//!
//! The configuration is stored as `hybrid.yml` and describes the local root,
//! the blob containers that own parts of the tree, and the temp/cache
//! mirrors that are cleaned up when a directory is deleted.
//!
//! Example format:
//! ```yaml
//! local_root: /srv/site
//! blob_root: /srv/blobs
//! marker_name: __dir.marker
//! max_path_length: 247
//! mode: hybrid
//! mirror_roots:
//!   - /srv/site/app_data/temp
//! default_container:
//!   name: site
//!   case_sensitive: false
//! containers:
//!   - name: media
//!     root: media
//!     case_sensitive: false
//! ```

use crate::container::ContainerDescriptor;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Leaf name of the zero-length blob that keeps an empty directory visible
pub const DEFAULT_MARKER_NAME: &str = "__dir.marker";

/// Longest accepted canonical path
pub const DEFAULT_MAX_PATH_LENGTH: usize = 247;

/// Which directory provider to build
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    /// Local filesystem merged with the blob store
    #[default]
    Hybrid,
    /// Local filesystem only
    Local,
}

impl FromStr for ProviderMode {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hybrid" => Ok(Self::Hybrid),
            "local" => Ok(Self::Local),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for ProviderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hybrid => write!(f, "hybrid"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// Settings consumed by the directory providers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HybridConfig {
    /// Application root on the local filesystem
    #[serde(default = "default_local_root")]
    pub local_root: String,
    /// Root directory of the on-disk blob store used by the CLI
    #[serde(default = "default_blob_root")]
    pub blob_root: String,
    /// Directory marker leaf name
    #[serde(default = "default_marker_name")]
    pub marker_name: String,
    /// Longest canonical path accepted before any I/O
    #[serde(default = "default_max_path_length")]
    pub max_path_length: usize,
    #[serde(default)]
    pub mode: ProviderMode,
    /// Temp/cache roots that mirror the tree and are cleaned on delete
    #[serde(default)]
    pub mirror_roots: Vec<String>,
    /// Container used when no routed container owns a path
    #[serde(default)]
    pub default_container: ContainerDescriptor,
    /// Routed containers, matched by longest root
    #[serde(default)]
    pub containers: Vec<ContainerDescriptor>,
}

fn default_local_root() -> String {
    ".".to_string()
}

fn default_blob_root() -> String {
    ".blobs".to_string()
}

fn default_marker_name() -> String {
    DEFAULT_MARKER_NAME.to_string()
}

fn default_max_path_length() -> usize {
    DEFAULT_MAX_PATH_LENGTH
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            local_root: default_local_root(),
            blob_root: default_blob_root(),
            marker_name: default_marker_name(),
            max_path_length: default_max_path_length(),
            mode: ProviderMode::default(),
            mirror_roots: Vec::new(),
            default_container: ContainerDescriptor::default(),
            containers: Vec::new(),
        }
    }
}

impl HybridConfig {
    /// Create a configuration rooted at `local_root` with default settings
    pub fn with_local_root(local_root: impl Into<String>) -> Self {
        Self {
            local_root: local_root.into(),
            ..Self::default()
        }
    }

    /// Add a routed container
    ///
    /// Returns true if the container was added, false if one with the same name exists
    pub fn add_container(&mut self, container: ContainerDescriptor) -> bool {
        if self.containers.iter().any(|c| c.name == container.name) {
            false
        } else {
            self.containers.push(container);
            true
        }
    }

    /// Read configuration from a YAML file
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!(
                "Failed to read hybrid config: {}",
                path.as_ref().display()
            )
        })?;

        let config: Self =
            serde_yaml::from_str(&content).with_context(|| "Failed to parse hybrid config YAML")?;

        config.validate()?;
        Ok(config)
    }

    /// Write configuration to a YAML file
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path.as_ref(), content).with_context(|| {
            format!(
                "Failed to write hybrid config: {}",
                path.as_ref().display()
            )
        })?;
        Ok(())
    }

    /// Load the config file if present, otherwise defaults, then apply
    /// environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = if path.exists() {
            log::debug!("Loading hybrid config from {}", path.display());
            Self::read(path)?
        } else {
            log::debug!("No config at {}, using defaults", path.display());
            Self::default()
        };
        config.with_env_overrides()
    }

    /// Apply `HYBRID_*` environment variables on top of this configuration
    ///
    /// - HYBRID_LOCAL_ROOT: application local root
    /// - HYBRID_BLOB_ROOT: on-disk blob store root
    /// - HYBRID_MODE: `hybrid` or `local`
    /// - HYBRID_MARKER_NAME: directory marker leaf name
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(root) = std::env::var("HYBRID_LOCAL_ROOT") {
            self.local_root = root;
        }
        if let Ok(root) = std::env::var("HYBRID_BLOB_ROOT") {
            self.blob_root = root;
        }
        if let Ok(mode) = std::env::var("HYBRID_MODE") {
            self.mode = mode
                .parse()
                .map_err(|_| eyre::eyre!("Invalid HYBRID_MODE: {}", mode))?;
        }
        if let Ok(marker) = std::env::var("HYBRID_MARKER_NAME") {
            self.marker_name = marker;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.marker_name.is_empty() || self.marker_name.contains(['/', '\\']) {
            eyre::bail!(
                "marker_name must be a single non-empty leaf name, got '{}'",
                self.marker_name
            );
        }
        if self.max_path_length == 0 {
            eyre::bail!("max_path_length must be greater than zero");
        }
        Ok(())
    }
}
