// rust/pager-core/src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Boxed cause of a failed fetch, as returned by a fetch capability.
pub type FetchFailure = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum PagerError {

    #[error("Construction error: {message}")]
    Construction {
        message: String,
    },

    #[error("Failed to fetch page {index} (size {size})")]
    Fetch {
        index: u64,
        size: usize,
        #[source]
        source: FetchFailure,
    },

    #[error("Background fetch ended without delivering a result")]
    Interrupted,

    #[error("No more elements")]
    NoMoreElements,

    #[error("Executor error: {message}")]
    Executor {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Storage error at '{path}': {message}")]
    Storage {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

pub type Result<T> = std::result::Result<T, PagerError>;

// Convenience constructors
impl PagerError {

    pub fn construction(message: impl Into<String>) -> Self {
        Self::Construction {
            message: message.into(),
        }
    }

    pub fn fetch(index: u64, size: usize, source: impl Into<FetchFailure>) -> Self {
        Self::Fetch {
            index,
            size,
            source: source.into(),
        }
    }

    pub fn executor(message: impl Into<String>) -> Self {
        Self::Executor {
            message: message.into(),
            source: None,
        }
    }

    pub fn executor_with_source(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Executor {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn storage(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn storage_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// True for the errors that end an iteration early: a failed fetch, an
    /// interrupted background task or a rejected job.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            Self::Fetch { .. } | Self::Interrupted | Self::Executor { .. }
        )
    }
}
