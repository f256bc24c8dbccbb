//! Directory marker convention
//!
//! A blob store does not keep empty prefixes, so an empty directory is kept
//! visible by a zero-length blob at `<directory-key>/<marker name>`. Existence
//! is still derived from any blob under the prefix, never from the marker alone.

use crate::config::DEFAULT_MARKER_NAME;
use crate::path::{BlobLocation, leaf_name};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryMarker {
    name: String,
}

impl Default for DirectoryMarker {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER_NAME)
    }
}

impl DirectoryMarker {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Marker key for the directory at `location`
    pub fn key_for(&self, location: &BlobLocation) -> String {
        location.child(&self.name)
    }

    /// True when `key` is a marker blob
    pub fn is_marker(&self, key: &str) -> bool {
        leaf_name(key) == self.name
    }
}
