//! Error types for directory operations
//!
//! Validation errors ([`DirectoryError::PathTooLong`], [`DirectoryError::InvalidPath`])
//! are raised before any backend is touched. Backend failures are carried
//! through unchanged in [`DirectoryError::Backend`].

use thiserror::Error;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, DirectoryError>;

/// Errors surfaced by directory operations
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Normalized path exceeds the configured maximum length
    #[error("Path too long ({length} > {max}): {path}")]
    PathTooLong {
        path: String,
        length: usize,
        max: usize,
    },

    /// Path contains characters or segments that are not allowed
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Destination of a move already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Source is neither a directory nor a file
    #[error("Not found: {0}")]
    NotFound(String),

    /// Shallow delete on a directory that still has content
    #[error("Directory is not empty: {0}")]
    NotEmpty(String),

    /// Source and destination of a move resolve to the same path
    #[error("Source and destination are the same path: {0}")]
    SamePath(String),

    /// Failure reported by the blob store or the local filesystem
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl DirectoryError {
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for the validation class of errors that are never worth retrying
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::Backend(_))
    }
}

/// Opaque failure from a storage collaborator
#[derive(Debug, Error)]
pub enum BackendError {
    /// Local filesystem I/O failure
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Blob store failure (network, permission, missing blob, ...)
    #[error("Blob store error in container '{container}' for key '{key}': {message}")]
    Blob {
        container: String,
        key: String,
        message: String,
    },

    /// The backend cannot perform the requested operation
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl BackendError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn blob(
        container: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Blob {
            container: container.into(),
            key: key.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(DirectoryError::NotEmpty("a".to_string()).is_validation());
        assert!(DirectoryError::invalid_path("a|b", "bad char").is_validation());

        let backend: DirectoryError = BackendError::blob("media", "a/b", "timeout").into();
        assert!(!backend.is_validation());
        assert!(backend.to_string().contains("timeout"));
    }

    #[test]
    fn test_path_too_long_message() {
        let err = DirectoryError::PathTooLong {
            path: "x".repeat(300),
            length: 300,
            max: 247,
        };
        assert!(err.to_string().contains("300 > 247"));
    }
}
