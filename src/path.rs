//! Path normalization between local-path syntax and blob-key syntax
//!
//! Local paths are `\`-separated and rooted (drive-rooted on Windows, `\`-rooted
//! for a Unix root such as `/srv/site`, which canonicalizes to `\srv\site`).
//! Blob keys are `/`-separated, relative to their container's root, with no
//! leading or trailing slash.
//!
//! Case folding follows the owning container: unless the container is
//! case-sensitive, everything below the local root is lower-cased. The
//! configured root itself is kept verbatim so that it still names the real
//! directory on case-sensitive hosts.

use crate::container::{ContainerDescriptor, ContainerResolver};
use crate::error::{DirectoryError, Result};
use std::sync::Arc;

/// Local path separator in canonical form
pub const LOCAL_SEPARATOR: char = '\\';

/// Blob key separator
pub const KEY_SEPARATOR: char = '/';

/// Characters never allowed inside a path segment
const INVALID_SEGMENT_CHARS: [char; 7] = ['<', '>', ':', '"', '|', '?', '*'];

/// A container and a key relative to its root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobLocation {
    pub container: ContainerDescriptor,
    /// `/`-separated, no leading or trailing slash; empty for the container root
    pub key: String,
}

impl BlobLocation {
    /// True when the key names the container root, which always exists
    pub fn is_container_root(&self) -> bool {
        self.key.is_empty()
    }

    /// Prefix used to list everything below this location
    pub fn prefix(&self) -> String {
        if self.key.is_empty() {
            String::new()
        } else {
            format!("{}{}", self.key, KEY_SEPARATOR)
        }
    }

    /// Key of a direct child of this location
    pub fn child(&self, name: &str) -> String {
        format!("{}{}", self.prefix(), name)
    }
}

/// Converts between local paths and blob keys
#[derive(Clone)]
pub struct PathNormalizer {
    local_root: String,
    resolver: Arc<dyn ContainerResolver>,
    max_path_length: usize,
}

impl std::fmt::Debug for PathNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathNormalizer")
            .field("local_root", &self.local_root)
            .field("max_path_length", &self.max_path_length)
            .finish()
    }
}

impl PathNormalizer {
    pub fn new(
        local_root: &str,
        resolver: Arc<dyn ContainerResolver>,
        max_path_length: usize,
    ) -> Self {
        Self {
            local_root: to_backslashes(local_root),
            resolver,
            max_path_length,
        }
    }

    /// Canonical local root (separators normalized, case preserved)
    pub fn local_root(&self) -> &str {
        &self.local_root
    }

    pub fn max_path_length(&self) -> usize {
        self.max_path_length
    }

    /// Canonical local path for `path`
    ///
    /// Replaces `/` with `\`, trims a trailing `\`, roots relative paths under
    /// the local root and lower-cases everything below the root unless the
    /// container is case-sensitive. `case_sensitive` overrides the container's
    /// policy when supplied.
    pub fn to_canonical_local(&self, path: &str, case_sensitive: Option<bool>) -> String {
        let case_sensitive =
            case_sensitive.unwrap_or_else(|| self.resolve(path).case_sensitive);
        let path = to_backslashes(path);

        match self.strip_local_root(&path) {
            Some(rest) => format!("{}{}", self.local_root, fold(rest, case_sensitive)),
            None if is_rooted(&path) => fold(&path, case_sensitive),
            None => self.join_root(&fold(&path, case_sensitive)),
        }
    }

    /// Container-relative blob key for `path`
    pub fn to_blob_key(&self, path: &str, case_sensitive: Option<bool>) -> String {
        self.locate_with(path, case_sensitive).key
    }

    /// Container and container-relative key for `path`
    pub fn locate(&self, path: &str) -> BlobLocation {
        self.locate_with(path, None)
    }

    fn locate_with(&self, path: &str, case_sensitive: Option<bool>) -> BlobLocation {
        let relative = self.relative_key(path);
        let container = self.resolver.resolve(&relative);
        let case_sensitive = case_sensitive.unwrap_or(container.case_sensitive);
        let key = fold(&container.container_key(&relative), case_sensitive);
        BlobLocation { container, key }
    }

    /// Canonical local path for a key inside `container`
    pub fn to_local_path(&self, container: &ContainerDescriptor, key: &str) -> String {
        let relative = container.relative_key(key);
        if relative.is_empty() {
            return self.local_root.clone();
        }
        let relative = fold(&relative, container.case_sensitive);
        self.join_root(&relative.replace(KEY_SEPARATOR, "\\"))
    }

    /// Container owning `path`
    pub fn resolve(&self, path: &str) -> ContainerDescriptor {
        self.resolver.resolve(&self.relative_key(path))
    }

    /// `/`-separated key relative to the local root, not case-folded
    pub fn relative_key(&self, path: &str) -> String {
        let path = to_backslashes(path);
        let rest = self.strip_local_root(&path).unwrap_or(&path);
        rest.replace(LOCAL_SEPARATOR, "/")
            .trim_matches(KEY_SEPARATOR)
            .to_string()
    }

    /// Path of `path` relative to the local root, `\`-separated, for mirror lookups
    pub fn relative_local(&self, path: &str) -> String {
        self.relative_key(path).replace(KEY_SEPARATOR, "\\")
    }

    /// Canonicalize and validate `path`
    ///
    /// Fails with [`DirectoryError::PathTooLong`] or
    /// [`DirectoryError::InvalidPath`] before any I/O happens.
    pub fn validated(&self, path: &str) -> Result<String> {
        if path.trim().is_empty() {
            return Err(DirectoryError::invalid_path(path, "path is empty"));
        }
        let canonical = self.to_canonical_local(path, None);
        let length = canonical.chars().count();
        if length > self.max_path_length {
            return Err(DirectoryError::PathTooLong {
                path: canonical,
                length,
                max: self.max_path_length,
            });
        }
        validate_segments(&canonical)?;
        Ok(canonical)
    }

    fn strip_local_root<'a>(&self, path: &'a str) -> Option<&'a str> {
        strip_segment_prefix(path, &self.local_root, LOCAL_SEPARATOR)
    }

    fn join_root(&self, relative: &str) -> String {
        let relative = relative.trim_matches(LOCAL_SEPARATOR);
        if relative.is_empty() {
            self.local_root.clone()
        } else if self.local_root.ends_with(LOCAL_SEPARATOR) {
            format!("{}{}", self.local_root, relative)
        } else {
            format!("{}{}{}", self.local_root, LOCAL_SEPARATOR, relative)
        }
    }
}

/// Replace `/` with `\` and trim trailing separators, keeping a bare `\`
pub fn to_backslashes(path: &str) -> String {
    let replaced = path.trim().replace(KEY_SEPARATOR, "\\");
    let trimmed = replaced.trim_end_matches(LOCAL_SEPARATOR);
    if trimmed.is_empty() && !replaced.is_empty() {
        "\\".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Last segment of a canonical local path or blob key
pub fn leaf_name(path: &str) -> &str {
    path.trim_end_matches([LOCAL_SEPARATOR, KEY_SEPARATOR])
        .rsplit([LOCAL_SEPARATOR, KEY_SEPARATOR])
        .next()
        .unwrap_or("")
}

/// Parent of a canonical local path by string truncation
///
/// Returns `None` at the top of the tree (no separator left, an empty
/// remainder or a bare drive).
pub fn parent_path(path: &str) -> Option<String> {
    let path = path.trim_end_matches(LOCAL_SEPARATOR);
    let idx = path.rfind(LOCAL_SEPARATOR)?;
    let parent = &path[..idx];
    if parent.is_empty() || is_drive(parent) {
        None
    } else {
        Some(parent.to_string())
    }
}

/// Join a canonical local directory and a child name
pub fn join_local(dir: &str, name: &str) -> String {
    if dir.ends_with(LOCAL_SEPARATOR) {
        format!("{}{}", dir, name)
    } else {
        format!("{}{}{}", dir, LOCAL_SEPARATOR, name)
    }
}

/// Case-insensitive prefix strip that only matches on a segment boundary
///
/// Returns the remainder, which is empty or starts with `sep`.
pub(crate) fn strip_segment_prefix<'a>(s: &'a str, prefix: &str, sep: char) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(s);
    }
    let head = s.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) && head.to_lowercase() != prefix.to_lowercase() {
        return None;
    }
    let rest = &s[prefix.len()..];
    if rest.is_empty() || rest.starts_with(sep) || prefix.ends_with(sep) {
        Some(rest)
    } else {
        None
    }
}

fn fold(s: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        s.to_string()
    } else {
        s.to_lowercase()
    }
}

fn is_drive(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn is_rooted(path: &str) -> bool {
    let bytes = path.as_bytes();
    path.starts_with(LOCAL_SEPARATOR)
        || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
}

fn validate_segments(canonical: &str) -> Result<()> {
    for (index, segment) in canonical.split(LOCAL_SEPARATOR).enumerate() {
        if index == 0 && is_drive(segment) {
            continue;
        }
        if let Some(c) = segment
            .chars()
            .find(|c| c.is_control() || INVALID_SEGMENT_CHARS.contains(c))
        {
            return Err(DirectoryError::invalid_path(
                canonical,
                format!("segment '{}' contains invalid character {:?}", segment, c),
            ));
        }
        if segment == ".." {
            return Err(DirectoryError::invalid_path(
                canonical,
                "parent segments ('..') are not supported",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::RoutingTable;

    fn normalizer(root: &str) -> PathNormalizer {
        let table = RoutingTable::new(
            ContainerDescriptor::new("site", "", false),
            vec![
                ContainerDescriptor::new("media", "media", false),
                ContainerDescriptor::new("raw", "raw", true),
            ],
        );
        PathNormalizer::new(root, Arc::new(table), 247)
    }

    #[test]
    fn test_canonical_local() {
        let n = normalizer("C:\\Site");
        assert_eq!(
            n.to_canonical_local("C:/Site/Media/Images/", None),
            "C:\\Site\\media\\images"
        );
        assert_eq!(n.to_canonical_local("media/Images", None), "C:\\Site\\media\\images");
        assert_eq!(n.to_canonical_local("raw/Images", None), "C:\\Site\\raw\\Images");
        assert_eq!(n.to_canonical_local("c:\\site", None), "C:\\Site");
    }

    #[test]
    fn test_canonical_override() {
        let n = normalizer("C:\\Site");
        assert_eq!(
            n.to_canonical_local("media/Images", Some(true)),
            "C:\\Site\\media\\Images"
        );
        assert_eq!(n.to_canonical_local("raw/Images", Some(false)), "C:\\Site\\raw\\images");
    }

    #[test]
    fn test_unix_root_is_kept_verbatim() {
        let n = normalizer("/tmp/.tmpAbC");
        assert_eq!(n.local_root(), "\\tmp\\.tmpAbC");
        assert_eq!(
            n.to_canonical_local("/tmp/.tmpAbC/Docs", None),
            "\\tmp\\.tmpAbC\\docs"
        );
        assert_eq!(n.to_canonical_local("\\other\\Dir", None), "\\other\\dir");
    }

    #[test]
    fn test_blob_key_relative_to_container() {
        let n = normalizer("C:\\Site");
        assert_eq!(n.to_blob_key("media\\images", None), "images");
        assert_eq!(n.to_blob_key("C:\\SITE\\Media\\Images\\", None), "images");
        assert_eq!(n.to_blob_key("css/Main", None), "css/main");
        assert_eq!(n.to_blob_key("raw/Shots/A", None), "Shots/A");
        assert_eq!(n.to_blob_key("media", None), "");
    }

    #[test]
    fn test_round_trip() {
        let n = normalizer("C:\\Site");
        for path in ["media\\Images\\2024", "css\\Main", "raw\\Shots\\A", "C:\\Site\\x"] {
            let canonical = n.to_canonical_local(path, None);
            let location = n.locate(&canonical);
            let back = n.to_local_path(&location.container, &location.key);
            assert_eq!(back, canonical, "round trip of {}", path);
        }
    }

    #[test]
    fn test_validation() {
        let n = normalizer("C:\\Site");
        assert!(n.validated("media\\images").is_ok());
        assert!(matches!(
            n.validated("media\\im|ages"),
            Err(DirectoryError::InvalidPath { .. })
        ));
        assert!(matches!(
            n.validated("media\\a:b"),
            Err(DirectoryError::InvalidPath { .. })
        ));
        assert!(matches!(
            n.validated("media\\..\\secret"),
            Err(DirectoryError::InvalidPath { .. })
        ));
        assert!(matches!(n.validated(""), Err(DirectoryError::InvalidPath { .. })));
        assert!(matches!(
            n.validated(&"a".repeat(300)),
            Err(DirectoryError::PathTooLong { max: 247, .. })
        ));
    }

    #[test]
    fn test_leaf_and_parent() {
        assert_eq!(leaf_name("C:\\site\\media\\images"), "images");
        assert_eq!(leaf_name("root/a/b"), "b");
        assert_eq!(parent_path("C:\\site\\media").as_deref(), Some("C:\\site"));
        assert_eq!(parent_path("C:\\site"), None);
        assert_eq!(parent_path("\\srv\\site").as_deref(), Some("\\srv"));
        assert_eq!(parent_path("\\srv"), None);
        assert_eq!(join_local("C:\\site", "a"), "C:\\site\\a");
    }

    #[test]
    fn test_blob_location_prefix() {
        let location = BlobLocation {
            container: ContainerDescriptor::default(),
            key: "root/a".to_string(),
        };
        assert_eq!(location.prefix(), "root/a/");
        assert_eq!(location.child("__dir.marker"), "root/a/__dir.marker");
        assert!(!location.is_container_root());
    }
}
