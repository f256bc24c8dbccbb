//! Hybrid Directory
//!
//! One hierarchical directory view over a local filesystem and a flat,
//! prefix-addressed blob store

pub mod blob;
pub mod cli;
pub mod clock;
pub mod config;
pub mod container;
pub mod directory;
pub mod error;
pub mod path;
pub mod pattern;
pub mod storage;

// Re-exports for convenience
pub use blob::{BlobEntry, BlobItem, BlobStore, DirectoryBlobStore, MemoryBlobStore};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{HybridConfig, ProviderMode};
pub use container::{ContainerDescriptor, ContainerResolver, RoutingTable};
pub use directory::{
    CleanupFailure, CleanupTarget, DeleteReport, Directories, DirectoryHandle, DirectoryMarker,
    DirectoryProvider, DirectorySnapshot, HybridDirectories, LocalDirectories, SearchScope,
};
pub use error::{BackendError, DirectoryError, Result};
pub use path::{BlobLocation, PathNormalizer};
pub use pattern::NamePattern;
