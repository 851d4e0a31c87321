// rust/pager-core/src/lib.rs

//! Pager - Core Library
//!
//! This crate provides sequential iteration over paged data sources with
//! background prefetch of the next page, along with the executors that run
//! those fetches, configuration handling, and a file-backed record source.

pub mod config;
pub mod error;
pub mod task;

// Re-export commonly used types for convenience
pub use config::{ExecutorKind, FirstPagePolicy, PagerConfig};
pub use error::{FetchFailure, PagerError, Result};
pub use task::{Executor, SerialExecutor, TaskHandle, ThreadExecutor};

#[cfg(feature = "tokio")]
pub use task::TokioExecutor;

pub mod paging;
pub use paging::{
    IteratorPhase, PageFetcher, PageRequest, PageResult, Pager, PagerBuilder, PrefetchingIterator,
};

pub mod storage;
pub use storage::{LocalStorage, ObjectMeta, StorageBackend, StorageReader};

pub mod records;
pub use records::{RecordFormat, RecordPages};
