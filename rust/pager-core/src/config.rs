// rust/pager-core/src/config.rs

//! Configuration for paged iteration.
//!
//! This module provides configuration parsing from TOML files, environment
//! variable overrides, and validation of configuration values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{PagerError, Result};

// Top-level pager configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagerConfig {
    pub paging: PagingConfig,
    pub executor: ExecutorConfig,
    pub storage: StorageConfig,
}

/// When the first page is fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirstPagePolicy {
    /// Fetch inline on the consuming thread at the first `has_next`/`next`.
    #[default]
    Lazy,
    /// Submit to the executor as soon as the iterator is created.
    Eager,
}

impl FromStr for FirstPagePolicy {
    type Err = PagerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "lazy" => Ok(Self::Lazy),
            "eager" => Ok(Self::Eager),
            _ => Err(PagerError::config(format!(
                "unknown first page policy: '{s}'. Expected 'lazy' or 'eager'"
            ))),
        }
    }
}

/// Executor used for background fetches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    /// One thread per fetch.
    #[default]
    Thread,
    /// A single worker thread shared by every iterator of a pager.
    Serial,
}

impl FromStr for ExecutorKind {
    type Err = PagerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "thread" => Ok(Self::Thread),
            "serial" => Ok(Self::Serial),
            _ => Err(PagerError::config(format!(
                "unknown executor kind: '{s}'. Expected 'thread' or 'serial'"
            ))),
        }
    }
}

/// Paging parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    /// Index of the first page to fetch.
    pub start_page: u64,
    /// Number of elements requested per page.
    pub page_size: usize,
    /// Last page index that may be fetched. Unbounded when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u64>,
    /// Fraction of the current page consumed before the next page is requested.
    pub prefetch_threshold: f64,
    pub first_page: FirstPagePolicy,
}

// Executor options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub kind: ExecutorKind,
    // Name given to fetch threads.
    pub thread_name: String,
}

// Storage options for file-backed record sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    // Base directory that relative record file paths resolve against.
    pub base_path: PathBuf,
    // Initial read window in bytes when scanning for records.
    pub buffer_size: usize,
    // Record format: "newline", "fixed:N" or "length-prefixed".
    pub format: String,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            start_page: 0,
            page_size: 10,
            total_pages: None,
            prefetch_threshold: 0.5,
            first_page: FirstPagePolicy::Lazy,
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            kind: ExecutorKind::Thread,
            thread_name: "pager-fetch".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            buffer_size: 64 * 1024, // 64 KB
            format: "newline".to_string(),
        }
    }
}

impl PagingConfig {
    /// Validate paging parameters.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(PagerError::config(
                "paging.page_size must be greater than 0",
            ));
        }
        if !self.prefetch_threshold.is_finite()
            || !(0.0..=1.0).contains(&self.prefetch_threshold)
        {
            return Err(PagerError::config(
                "paging.prefetch_threshold must be between 0.0 and 1.0",
            ));
        }
        Ok(())
    }
}

impl FromStr for PagerConfig {
    type Err = PagerError;

    /// Parse configuration from a TOML string.
    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s)
            .map_err(|e| PagerError::config_with_source("failed to parse TOML config", e))
    }
}

impl PagerConfig {
    // Load configuration from a TOML file.
    //
    // # Errors
    //
    // Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PagerError::storage_with_source(path, "failed to read config file", e)
        })?;
        let config: Self = content.parse()?;
        config.validate()?;
        Ok(config)
    }

    // Apply environment variable overrides.
    //
    // Environment variables are prefixed with `PAGER_` and use underscores
    // to separate nested fields. For example:
    // - `PAGER_PAGING_PAGE_SIZE` overrides `paging.page_size`
    // - `PAGER_PAGING_TOTAL_PAGES` overrides `paging.total_pages`
    // - `PAGER_EXECUTOR_KIND` overrides `executor.kind` ("thread" or "serial")
    // - `PAGER_STORAGE_FORMAT` overrides `storage.format`
    //
    // Values that fail to parse are ignored.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        // Paging overrides
        if let Ok(val) = std::env::var("PAGER_PAGING_START_PAGE") {
            if let Ok(v) = val.parse() {
                self.paging.start_page = v;
            }
        }
        if let Ok(val) = std::env::var("PAGER_PAGING_PAGE_SIZE") {
            if let Ok(v) = val.parse() {
                self.paging.page_size = v;
            }
        }
        if let Ok(val) = std::env::var("PAGER_PAGING_TOTAL_PAGES") {
            if let Ok(v) = val.parse() {
                self.paging.total_pages = Some(v);
            }
        }
        if let Ok(val) = std::env::var("PAGER_PAGING_PREFETCH_THRESHOLD") {
            if let Ok(v) = val.parse() {
                self.paging.prefetch_threshold = v;
            }
        }
        if let Ok(val) = std::env::var("PAGER_PAGING_FIRST_PAGE") {
            if let Ok(v) = val.parse() {
                self.paging.first_page = v;
            }
        }

        // Executor overrides
        if let Ok(val) = std::env::var("PAGER_EXECUTOR_KIND") {
            if let Ok(v) = val.parse() {
                self.executor.kind = v;
            }
        }
        if let Ok(val) = std::env::var("PAGER_EXECUTOR_THREAD_NAME") {
            self.executor.thread_name = val;
        }

        // Storage overrides
        if let Ok(val) = std::env::var("PAGER_STORAGE_BASE_PATH") {
            self.storage.base_path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("PAGER_STORAGE_BUFFER_SIZE") {
            if let Ok(v) = val.parse() {
                self.storage.buffer_size = v;
            }
        }
        if let Ok(val) = std::env::var("PAGER_STORAGE_FORMAT") {
            self.storage.format = val;
        }

        self
    }

    // Validate all configuration values.
    //
    // # Errors
    //
    // Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        self.paging.validate()?;

        if self.executor.thread_name.is_empty() {
            return Err(PagerError::config(
                "executor.thread_name must not be empty",
            ));
        }

        if self.storage.buffer_size == 0 {
            return Err(PagerError::config(
                "storage.buffer_size must be greater than 0",
            ));
        }
        crate::records::parse_format(&self.storage.format)?;

        Ok(())
    }
}
