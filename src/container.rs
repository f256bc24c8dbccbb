//! Container routing
//!
//! Decides which blob container owns a part of the tree and whether that
//! container compares names case-sensitively.

use crate::path::strip_segment_prefix;
use serde::{Deserialize, Serialize};

/// A blob container and the part of the tree it owns
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerDescriptor {
    /// Container name (used for blob store calls)
    pub name: String,
    /// Root of the container, as a `/`-separated key relative to the local root.
    /// Empty for a container that owns the whole tree.
    #[serde(default)]
    pub root: String,
    /// Whether names in this container keep their case
    #[serde(default)]
    pub case_sensitive: bool,
}

impl Default for ContainerDescriptor {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            root: String::new(),
            case_sensitive: false,
        }
    }
}

impl ContainerDescriptor {
    pub fn new(name: impl Into<String>, root: impl Into<String>, case_sensitive: bool) -> Self {
        Self {
            name: name.into(),
            root: root.into().trim_matches(['/', '\\']).replace('\\', "/"),
            case_sensitive,
        }
    }

    /// Check whether `relative_key` lies under this container's root
    pub fn owns(&self, relative_key: &str) -> bool {
        strip_segment_prefix(relative_key, &self.root, '/').is_some()
    }

    /// Strip the container root from an application-relative key
    ///
    /// Returns the key unchanged when it does not start with the root.
    pub fn container_key(&self, relative_key: &str) -> String {
        strip_segment_prefix(relative_key, &self.root, '/')
            .unwrap_or(relative_key)
            .trim_matches('/')
            .to_string()
    }

    /// Re-attach the container root to a container-relative key
    pub fn relative_key(&self, container_key: &str) -> String {
        let key = container_key.trim_matches('/');
        match (self.root.is_empty(), key.is_empty()) {
            (true, _) => key.to_string(),
            (false, true) => self.root.clone(),
            (false, false) => format!("{}/{}", self.root, key),
        }
    }
}

/// Resolves the container that owns an application-relative key
pub trait ContainerResolver: Send + Sync {
    /// `relative_key` is `/`-separated, relative to the local root, and not
    /// yet case-folded.
    fn resolve(&self, relative_key: &str) -> ContainerDescriptor;
}

/// Config-driven resolver: the routed container with the longest matching
/// root wins, otherwise the default container
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    default_container: ContainerDescriptor,
    containers: Vec<ContainerDescriptor>,
}

impl RoutingTable {
    pub fn new(default_container: ContainerDescriptor, containers: Vec<ContainerDescriptor>) -> Self {
        let normalize = |c: ContainerDescriptor| ContainerDescriptor::new(c.name, c.root, c.case_sensitive);
        Self {
            default_container: normalize(default_container),
            containers: containers.into_iter().map(normalize).collect(),
        }
    }

    /// Routing table with only a default container
    pub fn single(container: ContainerDescriptor) -> Self {
        Self::new(container, Vec::new())
    }

    pub fn containers(&self) -> &[ContainerDescriptor] {
        &self.containers
    }
}

impl ContainerResolver for RoutingTable {
    fn resolve(&self, relative_key: &str) -> ContainerDescriptor {
        let key = relative_key.trim_matches('/');
        let resolved = self
            .containers
            .iter()
            .filter(|c| c.owns(key))
            .max_by_key(|c| c.root.len())
            .unwrap_or(&self.default_container);
        log::trace!("Resolved '{}' to container '{}'", key, resolved.name);
        resolved.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RoutingTable {
        RoutingTable::new(
            ContainerDescriptor::new("site", "", false),
            vec![
                ContainerDescriptor::new("media", "media", false),
                ContainerDescriptor::new("originals", "media/originals", true),
            ],
        )
    }

    #[test]
    fn test_longest_root_wins() {
        let table = table();
        assert_eq!(table.resolve("media/images").name, "media");
        assert_eq!(table.resolve("Media/Originals/raw").name, "originals");
        assert_eq!(table.resolve("css/site.css").name, "site");
    }

    #[test]
    fn test_root_must_align_on_segment() {
        let table = table();
        assert_eq!(table.resolve("mediakit/a").name, "site");
        assert_eq!(table.resolve("media").name, "media");
    }

    #[test]
    fn test_container_key() {
        let media = ContainerDescriptor::new("media", "media", false);
        assert_eq!(media.container_key("media/images"), "images");
        assert_eq!(media.container_key("MEDIA/images/a"), "images/a");
        assert_eq!(media.container_key("media"), "");
        assert_eq!(media.relative_key("images"), "media/images");
        assert_eq!(media.relative_key(""), "media");

        let whole = ContainerDescriptor::default();
        assert_eq!(whole.container_key("a/b"), "a/b");
        assert_eq!(whole.relative_key("a/b"), "a/b");
    }

    #[test]
    fn test_new_normalizes_root() {
        let c = ContainerDescriptor::new("media", "\\media\\shared\\", false);
        assert_eq!(c.root, "media/shared");
    }
}
