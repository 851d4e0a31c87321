// rust/pager-core/src/storage/mod.rs

//! Read access to stored record files.
//!
//! File-backed page sources go through [`StorageBackend`] so that they can be
//! pointed at something other than the local filesystem, and so tests can
//! substitute an in-memory backend.
//!
//! # Example
//!
//! ```no_run
//! use pager_core::config::StorageConfig;
//! use pager_core::storage::{LocalStorage, StorageBackend};
//! use std::path::Path;
//!
//! let storage = LocalStorage::new(&StorageConfig::default()).unwrap();
//! let mut reader = storage.open_read(Path::new("records.jsonl")).unwrap();
//! let length = 16usize.min(reader.size() as usize);
//! let head = reader.read_range(0, length).unwrap();
//! ```

mod local;
mod traits;

pub use local::LocalStorage;
pub use traits::{ObjectMeta, StorageBackend, StorageReader};
