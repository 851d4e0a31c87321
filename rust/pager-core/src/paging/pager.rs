// rust/pager-core/src/paging/pager.rs

use std::fmt;
use std::sync::Arc;

use super::iterator::{PageSource, PrefetchingIterator};
use super::traits::{PageFetcher, PageRequest};
use crate::config::{ExecutorConfig, ExecutorKind, FirstPagePolicy, PagerConfig, PagingConfig};
use crate::error::{PagerError, Result};
use crate::task::{Executor, SerialExecutor, ThreadExecutor};

const DEFAULT_START_PAGE: u64 = 0;
const DEFAULT_PAGE_SIZE: usize = 10;
const DEFAULT_PREFETCH_THRESHOLD: f64 = 0.5;

/// A configured paged source that can be iterated any number of times.
///
/// Each call to [`iter`](Self::iter) starts an independent
/// [`PrefetchingIterator`] at the configured start page.
///
/// ```
/// use pager_core::{PageRequest, PageResult, Pager};
///
/// let pager = Pager::builder()
///     .page_size(3)
///     .fetcher(|request: PageRequest| -> Result<_, std::io::Error> {
///         let start = request.first_element().unwrap_or(0);
///         let items: Vec<u64> = if request.index < 2 {
///             (start..start + request.size as u64).collect()
///         } else {
///             Vec::new()
///         };
///         Ok(PageResult::for_request(request, items))
///     })
///     .build()
///     .unwrap();
///
/// let all: Vec<u64> = pager.iter().collect();
/// assert_eq!(all, vec![0, 1, 2, 3, 4, 5]);
/// ```
pub struct Pager<T> {
    source: PageSource<T>,
    start_page: u64,
    page_size: usize,
    threshold: f64,
    first_page: FirstPagePolicy,
}

impl<T: Send + 'static> Pager<T> {
    pub fn builder() -> PagerBuilder<T> {
        PagerBuilder::new()
    }

    /// A pager with default parameters over `fetcher`.
    pub fn new(fetcher: impl PageFetcher<T> + 'static) -> Self {
        Self {
            source: PageSource::new(
                Arc::new(fetcher),
                Arc::new(ThreadExecutor::default()),
                None,
            ),
            start_page: DEFAULT_START_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            threshold: DEFAULT_PREFETCH_THRESHOLD,
            first_page: FirstPagePolicy::Lazy,
        }
    }

    /// A pager using the paging and executor sections of `config`.
    ///
    /// # Errors
    ///
    /// Same as [`PagerBuilder::build`].
    pub fn from_config(
        config: &PagerConfig,
        fetcher: impl PageFetcher<T> + 'static,
    ) -> Result<Self> {
        Self::builder()
            .paging_config(&config.paging)
            .executor_config(&config.executor)
            .fetcher(fetcher)
            .build()
    }

    /// Starts a new iteration from the start page.
    pub fn iter(&self) -> PrefetchingIterator<T> {
        let first = PageRequest::new(self.start_page, self.page_size);
        let source = self.source.clone();
        match self.first_page {
            FirstPagePolicy::Lazy => PrefetchingIterator::lazy(source, first, self.threshold),
            FirstPagePolicy::Eager => PrefetchingIterator::eager(source, first, self.threshold),
        }
    }

    pub fn start_page(&self) -> u64 {
        self.start_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_pages(&self) -> Option<u64> {
        self.source.total_pages()
    }

    pub fn prefetch_threshold(&self) -> f64 {
        self.threshold
    }

    pub fn first_page_policy(&self) -> FirstPagePolicy {
        self.first_page
    }
}

impl<'a, T: Send + 'static> IntoIterator for &'a Pager<T> {
    type Item = T;
    type IntoIter = PrefetchingIterator<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> fmt::Debug for Pager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pager")
            .field("start_page", &self.start_page)
            .field("page_size", &self.page_size)
            .field("threshold", &self.threshold)
            .field("first_page", &self.first_page)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Pager`].
///
/// A fetch capability is required; everything else has a default.
pub struct PagerBuilder<T> {
    fetcher: Option<Arc<dyn PageFetcher<T>>>,
    executor: Option<Arc<dyn Executor>>,
    executor_config: ExecutorConfig,
    paging: PagingConfig,
}

impl<T: Send + 'static> PagerBuilder<T> {
    fn new() -> Self {
        Self {
            fetcher: None,
            executor: None,
            executor_config: ExecutorConfig::default(),
            paging: PagingConfig::default(),
        }
    }

    pub fn fetcher(mut self, fetcher: impl PageFetcher<T> + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    /// Uses a fetch capability that is shared with other owners.
    pub fn shared_fetcher(mut self, fetcher: Option<Arc<dyn PageFetcher<T>>>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn start_page(mut self, start_page: u64) -> Self {
        self.paging.start_page = start_page;
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.paging.page_size = page_size;
        self
    }

    /// Last page index that may be fetched; later pages read as empty.
    pub fn total_pages(mut self, total_pages: impl Into<Option<u64>>) -> Self {
        self.paging.total_pages = total_pages.into();
        self
    }

    pub fn prefetch_threshold(mut self, threshold: f64) -> Self {
        self.paging.prefetch_threshold = threshold;
        self
    }

    pub fn first_page(mut self, policy: FirstPagePolicy) -> Self {
        self.paging.first_page = policy;
        self
    }

    pub fn executor(mut self, executor: impl Executor + 'static) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    pub fn shared_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Takes paging parameters from `paging`.
    pub fn paging_config(mut self, paging: &PagingConfig) -> Self {
        self.paging = paging.clone();
        self
    }

    /// Builds the executor from `config` unless one is set explicitly.
    pub fn executor_config(mut self, config: &ExecutorConfig) -> Self {
        self.executor_config = config.clone();
        self
    }

    /// # Errors
    ///
    /// Returns [`PagerError::Construction`] if no fetch capability was given
    /// or a parameter is out of range, and [`PagerError::Executor`] if the
    /// configured executor cannot be started.
    pub fn build(self) -> Result<Pager<T>> {
        let fetcher = self
            .fetcher
            .ok_or_else(|| PagerError::construction("a fetch capability is required"))?;

        self.paging
            .validate()
            .map_err(|e| PagerError::construction(e.to_string()))?;

        let executor = match self.executor {
            Some(executor) => executor,
            None => build_executor(&self.executor_config)?,
        };

        Ok(Pager {
            source: PageSource::new(fetcher, executor, self.paging.total_pages),
            start_page: self.paging.start_page,
            page_size: self.paging.page_size,
            threshold: self.paging.prefetch_threshold,
            first_page: self.paging.first_page,
        })
    }
}

fn build_executor(config: &ExecutorConfig) -> Result<Arc<dyn Executor>> {
    Ok(match config.kind {
        ExecutorKind::Thread => Arc::new(ThreadExecutor::new(config.thread_name.clone())),
        ExecutorKind::Serial => Arc::new(SerialExecutor::new(config.thread_name.clone())?),
    })
}
