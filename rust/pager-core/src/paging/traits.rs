// rust/pager-core/src/paging/traits.rs

use crate::error::FetchFailure;

/// Identifies one page of a paged data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    pub index: u64,
    pub size: usize,
}

impl PageRequest {
    pub fn new(index: u64, size: usize) -> Self {
        Self { index, size }
    }

    /// The request for the page that follows this one, with the same size.
    /// `None` when this is the last representable page index.
    pub fn next(&self) -> Option<Self> {
        let index = self.index.checked_add(1)?;
        Some(Self::new(index, self.size))
    }

    /// Index of the first element of this page, counting across all pages.
    /// `None` if that index does not fit in a `u64`.
    pub fn first_element(&self) -> Option<u64> {
        self.index.checked_mul(self.size as u64)
    }
}

/// A fetched page. A page without items marks the end of the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult<T> {
    pub index: u64,
    pub size: usize,
    pub items: Vec<T>,
}

impl<T> PageResult<T> {
    pub fn new(index: u64, size: usize, items: Vec<T>) -> Self {
        Self { index, size, items }
    }

    /// Builds the page answering `request` from its items.
    pub fn for_request(request: PageRequest, items: Vec<T>) -> Self {
        Self::new(request.index, request.size, items)
    }

    /// The end-of-data page for `request`.
    pub fn empty(request: PageRequest) -> Self {
        Self::for_request(request, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// The data source behind a paged iteration.
///
/// Called from whichever thread runs the fetch, so implementations must be
/// `Send + Sync`. A failure ends the iteration; retrying is up to the
/// implementation.
pub trait PageFetcher<T>: Send + Sync {
    fn fetch(&self, request: PageRequest) -> std::result::Result<PageResult<T>, FetchFailure>;
}

impl<T, E, F> PageFetcher<T> for F
where
    F: Fn(PageRequest) -> std::result::Result<PageResult<T>, E> + Send + Sync,
    E: Into<FetchFailure>,
{
    fn fetch(&self, request: PageRequest) -> std::result::Result<PageResult<T>, FetchFailure> {
        self(request).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_request_keeps_size() {
        let request = PageRequest::new(4, 25);
        assert_eq!(request.next(), Some(PageRequest::new(5, 25)));
        assert_eq!(request.first_element(), Some(100));
    }

    #[test]
    fn test_page_arithmetic_at_the_limits() {
        assert_eq!(PageRequest::new(u64::MAX, 1).next(), None);
        assert_eq!(PageRequest::new(u64::MAX / 2, 4).first_element(), None);
        assert_eq!(PageRequest::new(u64::MAX, 0).first_element(), Some(0));
    }

    #[test]
    fn test_empty_page() {
        let page: PageResult<u8> = PageResult::empty(PageRequest::new(2, 10));
        assert!(page.is_empty());
        assert_eq!(page.index, 2);
        assert_eq!(page.size, 10);
    }

    #[test]
    fn test_closure_is_a_fetcher() {
        let fetcher = |request: PageRequest| -> std::result::Result<_, String> {
            if request.index > 1 {
                return Err(format!("no page {}", request.index));
            }
            Ok(PageResult::for_request(request, vec![request.index; request.size]))
        };

        let page = fetcher.fetch(PageRequest::new(1, 3)).unwrap();
        assert_eq!(page.items, vec![1, 1, 1]);

        let err = fetcher.fetch(PageRequest::new(2, 3)).unwrap_err();
        assert_eq!(err.to_string(), "no page 2");
    }
}
