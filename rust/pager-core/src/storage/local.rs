// rust/pager-core/src/storage/local.rs

//! Local filesystem storage backend.

use std::fs::{self, File};
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::traits::{ObjectMeta, StorageBackend, StorageReader};
use crate::config::StorageConfig;
use crate::error::{PagerError, Result};

/// Local filesystem storage backend.
///
/// Relative paths resolve against the configured base directory; absolute
/// paths are used as given.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    /// Base path for relative lookups.
    base_path: PathBuf,
    /// Buffer size for buffered reads.
    buffer_size: usize,
}

impl LocalStorage {
    /// Creates a new `LocalStorage` instance from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base path does not exist or is not a directory.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let base_path = config.base_path.clone();

        if !base_path.is_dir() {
            return Err(PagerError::storage(
                &base_path,
                "base path is not an existing directory",
            ));
        }

        Ok(Self {
            base_path,
            buffer_size: config.buffer_size,
        })
    }

    /// Resolves a path relative to the base path.
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }
}

impl StorageBackend for LocalStorage {
    fn metadata(&self, path: &Path) -> Result<ObjectMeta> {
        let full_path = self.resolve_path(path);
        let meta = fs::metadata(&full_path).map_err(|e| {
            PagerError::storage_with_source(&full_path, "failed to read metadata", e)
        })?;

        if meta.is_dir() {
            return Err(PagerError::storage(&full_path, "path is a directory"));
        }

        Ok(ObjectMeta { size: meta.len() })
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn StorageReader>> {
        let full_path = self.resolve_path(path);
        let file = File::open(&full_path)
            .map_err(|e| PagerError::storage_with_source(&full_path, "failed to open file", e))?;

        let meta = file.metadata().map_err(|e| {
            PagerError::storage_with_source(&full_path, "failed to read file metadata", e)
        })?;
        if meta.is_dir() {
            return Err(PagerError::storage(&full_path, "path is a directory"));
        }

        Ok(Box::new(LocalReader::new(
            file,
            full_path,
            meta.len(),
            self.buffer_size,
        )))
    }
}

/// Buffered file reader for local storage.
struct LocalReader {
    reader: BufReader<File>,
    path: PathBuf,
    size: u64,
}

impl LocalReader {
    fn new(file: File, path: PathBuf, size: u64, buffer_size: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(buffer_size, file),
            path,
            size,
        }
    }
}

impl StorageReader for LocalReader {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_range(&mut self, start: u64, length: usize) -> Result<Vec<u8>> {
        let end = start.saturating_add(length as u64);
        if end > self.size {
            return Err(PagerError::storage(
                &self.path,
                format!("read range {start}..{end} exceeds file size {}", self.size),
            ));
        }

        self.reader.seek(SeekFrom::Start(start)).map_err(|e| {
            PagerError::storage_with_source(
                &self.path,
                format!("failed to seek to position {start}"),
                e,
            )
        })?;

        let mut buf = vec![0u8; length];
        self.reader.read_exact(&mut buf).map_err(|e| {
            PagerError::storage_with_source(
                &self.path,
                format!("failed to read {length} bytes at position {start}"),
                e,
            )
        })?;

        Ok(buf)
    }
}
