//! Local storage and file-level operations
//!
//! This module handles the local side of the hybrid tree:
//! - Local directory access by canonical path
//! - Single-file existence, copy, move and delete across both backends

mod files;
mod local;

pub use files::{FileOperations, HybridFiles};
pub use local::{LocalDirectory, LocalTimes, file_exists, native_path, resolve_native};
