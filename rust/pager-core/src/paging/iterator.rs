// rust/pager-core/src/paging/iterator.rs

//! Prefetching iterator over a paged source.
//!
//! The iterator keeps at most two pages alive: the page being consumed and
//! the next page, which is requested from the executor once the consumed
//! fraction of the current page reaches the prefetch threshold. When the
//! current page runs out, the iterator waits for that prefetch and adopts it.
//!
//! Fetch failures are not returned to the caller. They end the iteration,
//! are logged, and stay available through [`PrefetchingIterator::failure`].

use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use super::traits::{PageFetcher, PageRequest, PageResult};
use crate::error::{PagerError, Result};
use crate::task::{self, Executor, TaskHandle};

/// Fetch capability, executor and total-page bound shared by the iterators
/// of one pager.
pub(crate) struct PageSource<T> {
    fetcher: Arc<dyn PageFetcher<T>>,
    executor: Arc<dyn Executor>,
    total_pages: Option<u64>,
}

impl<T> Clone for PageSource<T> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            executor: Arc::clone(&self.executor),
            total_pages: self.total_pages,
        }
    }
}

impl<T: Send + 'static> PageSource<T> {
    pub(crate) fn new(
        fetcher: Arc<dyn PageFetcher<T>>,
        executor: Arc<dyn Executor>,
        total_pages: Option<u64>,
    ) -> Self {
        Self {
            fetcher,
            executor,
            total_pages,
        }
    }

    pub(crate) fn total_pages(&self) -> Option<u64> {
        self.total_pages
    }

    /// Pages past the bound are never fetched.
    fn past_bound(&self, request: PageRequest) -> bool {
        matches!(self.total_pages, Some(last) if request.index > last)
    }

    /// Fetches a page on the calling thread.
    fn fetch_now(&self, request: PageRequest) -> Result<PageResult<T>> {
        if self.past_bound(request) {
            tracing::debug!(index = request.index, "Page is past the total page bound");
            return Ok(PageResult::empty(request));
        }
        fetch_page(self.fetcher.as_ref(), request)
    }

    /// Submits a fetch to the executor.
    fn request(&self, request: PageRequest) -> TaskHandle<PageResult<T>> {
        if self.past_bound(request) {
            tracing::debug!(index = request.index, "Page is past the total page bound");
            return TaskHandle::completed(Ok(PageResult::empty(request)));
        }
        let fetcher = Arc::clone(&self.fetcher);
        task::spawn(self.executor.as_ref(), move || {
            fetch_page(fetcher.as_ref(), request)
        })
    }
}

fn fetch_page<T>(fetcher: &dyn PageFetcher<T>, request: PageRequest) -> Result<PageResult<T>> {
    tracing::debug!(index = request.index, size = request.size, "Fetching page");
    fetcher
        .fetch(request)
        .map_err(|e| PagerError::fetch(request.index, request.size, e))
}

/// Coarse state of an iterator, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IteratorPhase {
    /// The first page has not been adopted yet.
    Unstarted,
    /// A non-empty page is being consumed.
    Reading,
    /// An empty page or a failure was seen. Terminal.
    Exhausted,
}

enum State<T> {
    Unstarted(PageRequest),
    /// First page already submitted to the executor.
    Starting(PageRequest, TaskHandle<PageResult<T>>),
    Reading(CurrentPage<T>),
    Exhausted,
}

struct CurrentPage<T> {
    /// Index and size reported by the fetched page.
    index: u64,
    size: usize,
    items: std::vec::IntoIter<T>,
    len: usize,
    consumed: usize,
    pending: Option<TaskHandle<PageResult<T>>>,
}

impl<T> CurrentPage<T> {
    /// The page after this one, as reported by the fetcher.
    fn next_request(&self) -> Option<PageRequest> {
        PageRequest::new(self.index, self.size).next()
    }

    fn threshold_passed(&self, threshold: f64) -> bool {
        self.consumed as f64 / self.len as f64 >= threshold
    }
}

/// Element-by-element iterator over a paged source, fetching the next page
/// in the background while the current one is consumed.
///
/// Created by [`Pager::iter`](super::Pager::iter). Elements come out in
/// page order and, within a page, in the order the fetcher returned them.
/// The iterator is forward-only and cannot be restarted.
///
/// Dropping the iterator while a prefetch is in flight leaves that fetch to
/// finish in the background; its page is discarded.
pub struct PrefetchingIterator<T> {
    source: PageSource<T>,
    threshold: f64,
    state: State<T>,
    failure: Option<PagerError>,
}

impl<T: Send + 'static> PrefetchingIterator<T> {
    /// An iterator that fetches `first` at its first use.
    pub(crate) fn lazy(source: PageSource<T>, first: PageRequest, threshold: f64) -> Self {
        Self {
            source,
            threshold,
            state: State::Unstarted(first),
            failure: None,
        }
    }

    /// An iterator whose first page is already being fetched in the background.
    pub(crate) fn eager(source: PageSource<T>, first: PageRequest, threshold: f64) -> Self {
        let handle = source.request(first);
        Self {
            source,
            threshold,
            state: State::Starting(first, handle),
            failure: None,
        }
    }

    /// Returns true if another element is available.
    ///
    /// Obtains the first page if that has not happened yet, blocking until it
    /// is fetched. Calling this repeatedly without `next` changes nothing.
    pub fn has_next(&mut self) -> bool {
        self.start_reading();
        matches!(&self.state, State::Reading(page) if page.items.len() > 0)
    }

    /// Returns the next element.
    ///
    /// # Errors
    ///
    /// Returns [`PagerError::NoMoreElements`] once the iteration is over,
    /// whether it ended on an empty page or on a failed fetch.
    pub fn next_item(&mut self) -> Result<T> {
        self.start_reading();

        let State::Reading(page) = &mut self.state else {
            return Err(PagerError::NoMoreElements);
        };
        let item = page.items.next().ok_or(PagerError::NoMoreElements)?;
        page.consumed += 1;

        if page.pending.is_none() && page.threshold_passed(self.threshold) {
            if let Some(next) = page.next_request() {
                tracing::debug!(
                    index = next.index,
                    consumed = page.consumed,
                    len = page.len,
                    "Prefetching next page"
                );
                page.pending = Some(self.source.request(next));
            }
        }

        if page.items.len() == 0 {
            self.turn_page();
        }

        Ok(item)
    }

    /// The failure that ended the iteration early, if any.
    pub fn failure(&self) -> Option<&PagerError> {
        self.failure.as_ref()
    }

    /// Takes the recorded failure out of the iterator.
    pub fn take_failure(&mut self) -> Option<PagerError> {
        self.failure.take()
    }

    /// Where the iterator is in its lifecycle.
    pub fn phase(&self) -> IteratorPhase {
        match self.state {
            State::Unstarted(_) | State::Starting(..) => IteratorPhase::Unstarted,
            State::Reading(_) => IteratorPhase::Reading,
            State::Exhausted => IteratorPhase::Exhausted,
        }
    }

    /// True while a fetch for the next page is outstanding or not yet adopted.
    pub fn is_prefetching(&self) -> bool {
        match &self.state {
            State::Starting(..) => true,
            State::Reading(page) => page.pending.is_some(),
            _ => false,
        }
    }

    /// Index and size of the page currently being consumed, as reported by
    /// the fetcher.
    pub fn current_page(&self) -> Option<PageRequest> {
        match &self.state {
            State::Reading(page) => Some(PageRequest::new(page.index, page.size)),
            _ => None,
        }
    }

    /// Elements taken from the current page so far.
    pub fn consumed(&self) -> usize {
        match &self.state {
            State::Reading(page) => page.consumed,
            _ => 0,
        }
    }

    fn start_reading(&mut self) {
        let (request, result) = match std::mem::replace(&mut self.state, State::Exhausted) {
            State::Unstarted(request) => (request, self.source.fetch_now(request)),
            State::Starting(request, handle) => (request, handle.wait()),
            other => {
                self.state = other;
                return;
            }
        };
        self.adopt(request, result);
    }

    /// Replaces the exhausted current page with the prefetched one.
    fn turn_page(&mut self) {
        let State::Reading(page) = std::mem::replace(&mut self.state, State::Exhausted) else {
            return;
        };
        let Some(next) = page.next_request() else {
            tracing::debug!(index = page.index, "No page index follows the current page");
            return;
        };

        let result = match page.pending {
            Some(mut handle) => {
                if !handle.is_finished() {
                    tracing::debug!(index = next.index, "Waiting for prefetched page");
                }
                handle.wait()
            }
            None => self.source.fetch_now(next),
        };
        self.adopt(next, result);
    }

    fn adopt(&mut self, request: PageRequest, result: Result<PageResult<T>>) {
        self.state = match result {
            Ok(page) if page.is_empty() => {
                tracing::debug!(index = request.index, "Reached an empty page");
                State::Exhausted
            }
            Ok(page) => {
                if page.index != request.index || page.size != request.size {
                    tracing::debug!(
                        requested = request.index,
                        returned = page.index,
                        size = page.size,
                        "Continuing from the page the fetcher returned"
                    );
                }
                let len = page.items.len();
                State::Reading(CurrentPage {
                    index: page.index,
                    size: page.size,
                    items: page.items.into_iter(),
                    len,
                    consumed: 0,
                    pending: None,
                })
            }
            Err(e) => {
                tracing::error!(
                    index = request.index,
                    size = request.size,
                    error = %e,
                    "Error while fetching page, ending iteration"
                );
                self.failure = Some(e);
                State::Exhausted
            }
        };
    }
}

impl<T: Send + 'static> Iterator for PrefetchingIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_item().ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.state {
            State::Reading(page) => (page.items.len(), None),
            State::Exhausted => (0, Some(0)),
            _ => (0, None),
        }
    }
}

impl<T: Send + 'static> FusedIterator for PrefetchingIterator<T> {}

impl<T> Drop for PrefetchingIterator<T> {
    fn drop(&mut self) {
        let in_flight = match &self.state {
            State::Starting(..) => true,
            State::Reading(page) => page.pending.is_some(),
            _ => false,
        };
        if in_flight {
            tracing::debug!("Iterator dropped with a fetch in flight; its page will be discarded");
        }
    }
}

impl<T> fmt::Debug for PrefetchingIterator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match &self.state {
            State::Unstarted(_) | State::Starting(..) => "unstarted",
            State::Reading(_) => "reading",
            State::Exhausted => "exhausted",
        };
        let mut s = f.debug_struct("PrefetchingIterator");
        s.field("phase", &phase)
            .field("threshold", &self.threshold)
            .field("total_pages", &self.source.total_pages);
        if let State::Reading(page) = &self.state {
            s.field("page", &page.index)
                .field("size", &page.size)
                .field("consumed", &page.consumed)
                .field("len", &page.len)
                .field("prefetching", &page.pending.is_some());
        }
        s.field("failure", &self.failure).finish()
    }
}
