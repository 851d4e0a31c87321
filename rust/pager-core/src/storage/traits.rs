// rust/pager-core/src/storage/traits.rs

//! Storage abstraction traits.
//!
//! Only the read side is modelled: page sources never write.

use std::path::Path;

use crate::error::Result;

/// Metadata about a stored object.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    /// Size of the object in bytes.
    pub size: u64,
}

/// A handle for reading from storage.
pub trait StorageReader: Send {
    /// Returns the total size of the object in bytes.
    fn size(&self) -> u64;

    /// Reads exactly `length` bytes starting at `start`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the range is out of bounds.
    fn read_range(&mut self, start: u64, length: usize) -> Result<Vec<u8>>;
}

/// A storage backend that record sources read from.
///
/// This trait is object-safe and can be used with `Arc<dyn StorageBackend>`.
pub trait StorageBackend: Send + Sync {
    /// Retrieves metadata for an object.
    ///
    /// # Errors
    ///
    /// Returns an error if the object doesn't exist, is a directory, or its
    /// metadata cannot be read.
    fn metadata(&self, path: &Path) -> Result<ObjectMeta>;

    /// Opens an object for reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the object doesn't exist or cannot be opened.
    fn open_read(&self, path: &Path) -> Result<Box<dyn StorageReader>>;
}
