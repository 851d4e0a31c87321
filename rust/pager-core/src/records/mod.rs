// rust/pager-core/src/records/mod.rs

//! Record files as a paged source.
//!
//! [`RecordPages`] serves the records of a file page by page, so a
//! [`Pager`](crate::Pager) can stream a large file while the next page is
//! read in the background. Record boundaries come from a [`RecordFormat`]:
//! fixed-size records, newline-delimited records, or length-prefixed records.
//!
//! # Example
//!
//! ```no_run
//! use pager_core::config::StorageConfig;
//! use pager_core::records::RecordPages;
//! use pager_core::Pager;
//!
//! let pages = RecordPages::from_config(&StorageConfig::default(), "events.jsonl").unwrap();
//! let pager: Pager<Vec<u8>> = Pager::builder()
//!     .page_size(1000)
//!     .fetcher(pages)
//!     .build()
//!     .unwrap();
//!
//! for record in &pager {
//!     println!("{}", String::from_utf8_lossy(&record));
//! }
//! ```

mod format;
mod pages;

pub use format::{
    parse_format, FixedSizeFormat, LengthPrefixedFormat, NewlineDelimitedFormat, RecordFormat,
};
pub use pages::RecordPages;
