// rust/pager-cli/src/main.rs

//! Pager command line tool
//!
//! Streams the records of a file page by page, fetching the next page in the
//! background while the current one is written to stdout.
//!
//! # Usage
//!
//! ```bash
//! # Print every line of a JSONL file, 1000 records per page
//! pager events.jsonl --page-size 1000
//!
//! # Fixed-size records, pages 5 through 9 only
//! pager data.bin --format fixed:128 --start-page 5 --total-pages 9
//!
//! # Start from a configuration file
//! pager events.jsonl --config pager.toml
//! ```

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pager_core::records::RecordPages;
use pager_core::{ExecutorKind, FirstPagePolicy, Pager, PagerConfig};

/// Prefetching record pager
#[derive(Parser, Debug)]
#[command(name = "pager")]
#[command(about = "Stream the records of a file with background page prefetch")]
struct Args {
    /// Record file to read, relative to the storage base path
    file: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Record format (newline, fixed:N, length-prefixed)
    #[arg(short, long)]
    format: Option<String>,

    /// Records per page
    #[arg(short = 's', long)]
    page_size: Option<usize>,

    /// Index of the first page to read
    #[arg(long)]
    start_page: Option<u64>,

    /// Last page index to read (inclusive)
    #[arg(long)]
    total_pages: Option<u64>,

    /// Fraction of a page consumed before the next page is requested
    #[arg(long)]
    threshold: Option<f64>,

    /// When the first page is fetched (lazy, eager)
    #[arg(long)]
    first_page: Option<FirstPagePolicy>,

    /// Executor for background fetches (thread, serial)
    #[arg(long)]
    executor: Option<ExecutorKind>,

    /// Stop after this many records
    #[arg(short = 'n', long)]
    limit: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Args {
    /// Apply command line overrides on top of file and environment settings.
    fn apply(&self, config: &mut PagerConfig) {
        if let Some(format) = &self.format {
            config.storage.format = format.clone();
        }
        if let Some(page_size) = self.page_size {
            config.paging.page_size = page_size;
        }
        if let Some(start_page) = self.start_page {
            config.paging.start_page = start_page;
        }
        if let Some(total_pages) = self.total_pages {
            config.paging.total_pages = Some(total_pages);
        }
        if let Some(threshold) = self.threshold {
            config.paging.prefetch_threshold = threshold;
        }
        if let Some(policy) = self.first_page {
            config.paging.first_page = policy;
        }
        if let Some(kind) = self.executor {
            config.executor.kind = kind;
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging; stdout carries the records
    let filter = tracing_subscriber::filter::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let mut config = match &args.config {
        Some(path) => PagerConfig::from_file(path)?,
        None => PagerConfig::default(),
    }
    .with_env_overrides();
    args.apply(&mut config);
    config.validate()?;

    let pages = RecordPages::from_config(&config.storage, &args.file)?;

    tracing::info!("Paging {}", pages.path().display());
    tracing::info!("  Format: {}", pages.format_name());
    tracing::info!("  Page size: {}", config.paging.page_size);
    tracing::info!("  Start page: {}", config.paging.start_page);
    tracing::info!("  Prefetch threshold: {}", config.paging.prefetch_threshold);
    tracing::info!("  Executor: {:?}", config.executor.kind);

    let pager: Pager<Vec<u8>> = Pager::from_config(&config, pages)?;
    let mut iter = pager.iter();

    let started = Instant::now();
    let mut written = 0usize;
    let mut out = BufWriter::new(io::stdout().lock());

    while args.limit.map_or(true, |limit| written < limit) {
        let Some(record) = iter.next() else {
            break;
        };
        out.write_all(&record)?;
        out.write_all(b"\n")?;
        written += 1;
    }
    out.flush()?;

    tracing::info!(
        records = written,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Done"
    );

    if let Some(failure) = iter.take_failure() {
        return Err(failure.into());
    }

    Ok(())
}
