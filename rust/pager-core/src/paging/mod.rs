// rust/pager-core/src/paging/mod.rs

//! Sequential iteration over paged data with background prefetch.
//!
//! A [`Pager`] combines a fetch capability ([`PageFetcher`]) with paging
//! parameters. Iterating it yields the elements of page after page, starting
//! at the start page and stopping at the first empty page, at the total page
//! bound, or at the first failed fetch.
//!
//! # Example
//!
//! ```ignore
//! use pager_core::{Pager, PageRequest, PageResult};
//!
//! let pager = Pager::builder()
//!     .page_size(10_000)
//!     .prefetch_threshold(0.5)
//!     .fetcher(|request: PageRequest| database.fetch_rows(request))
//!     .build()?;
//!
//! for row in &pager {
//!     // Process row while the next page loads in the background
//! }
//! ```

mod iterator;
mod pager;
mod traits;

pub use iterator::{IteratorPhase, PrefetchingIterator};
pub use pager::{Pager, PagerBuilder};
pub use traits::{PageFetcher, PageRequest, PageResult};
