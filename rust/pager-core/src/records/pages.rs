// rust/pager-core/src/records/pages.rs

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::format::{parse_format, RecordFormat};
use crate::config::StorageConfig;
use crate::error::{FetchFailure, Result};
use crate::paging::{PageFetcher, PageRequest, PageResult};
use crate::storage::{LocalStorage, StorageBackend, StorageReader};

/// Position of the next unread record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RecordCursor {
    /// Index of the record starting at `offset`.
    record: u64,
    offset: u64,
}

/// Pages of records read from a file.
///
/// Page `n` of size `s` holds records `n * s .. (n + 1) * s`, with framing
/// bytes removed. A page past the last record is empty, which ends any
/// iteration over it.
///
/// Records are found by scanning from the start of the file. The position
/// after the last page served is remembered, so sequential pages cost one
/// scan in total; asking for an earlier page scans again from the start.
pub struct RecordPages {
    storage: Arc<dyn StorageBackend>,
    path: PathBuf,
    format: Arc<dyn RecordFormat>,
    chunk_size: usize,
    cursor: Mutex<RecordCursor>,
}

impl RecordPages {
    /// Create a record source.
    ///
    /// # Arguments
    ///
    /// * `storage` - The storage backend to read from
    /// * `path` - Path to the record file
    /// * `format` - The record format for finding record boundaries
    /// * `chunk_size` - Number of bytes read at a time while scanning
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        path: impl Into<PathBuf>,
        format: Arc<dyn RecordFormat>,
        chunk_size: usize,
    ) -> Self {
        Self {
            storage,
            path: path.into(),
            format,
            chunk_size: chunk_size.max(1),
            cursor: Mutex::new(RecordCursor::default()),
        }
    }

    /// Create a record source over local storage, using the configured base
    /// path, read buffer size and record format.
    ///
    /// # Errors
    ///
    /// Returns an error if the format is unknown, the base path is not a
    /// directory, or the file does not exist.
    pub fn from_config(config: &StorageConfig, path: impl AsRef<Path>) -> Result<Self> {
        let format = parse_format(&config.format)?;
        let storage = LocalStorage::new(config)?;
        let path = path.as_ref();

        // Fail at construction rather than on the first fetch.
        let meta = storage.metadata(path)?;
        tracing::debug!(
            path = %path.display(),
            size = meta.size,
            format = format.name(),
            "Opened record file"
        );

        Ok(Self::new(
            Arc::new(storage),
            path,
            format,
            config.buffer_size,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format_name(&self) -> &'static str {
        self.format.name()
    }

    /// Read the records of one page.
    pub fn read_page(&self, request: PageRequest) -> Result<Vec<Vec<u8>>> {
        let Some(first) = request.first_element() else {
            tracing::debug!(
                path = %self.path.display(),
                index = request.index,
                size = request.size,
                "Page starts past the last addressable record"
            );
            return Ok(Vec::new());
        };

        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        if first < cursor.record {
            tracing::debug!(
                path = %self.path.display(),
                record = first,
                cursor = cursor.record,
                "Rewinding record cursor"
            );
            *cursor = RecordCursor::default();
        }

        let mut reader = self.storage.open_read(&self.path)?;
        self.scan(reader.as_mut(), &mut cursor, first, request.size)
    }

    /// Advance `cursor` to record `first`, then collect up to `count`
    /// record payloads.
    fn scan(
        &self,
        reader: &mut dyn StorageReader,
        cursor: &mut RecordCursor,
        first: u64,
        count: usize,
    ) -> Result<Vec<Vec<u8>>> {
        let file_size = reader.size();
        let mut records = Vec::with_capacity(count);

        // `buf` holds file bytes starting at `buf_start`; `pos` is the start
        // of the next record within it.
        let mut buf: Vec<u8> = Vec::new();
        let mut buf_start = cursor.offset;
        let mut pos = 0usize;

        while records.len() < count {
            let end = match self.format.find_record_end(&buf, pos) {
                Some(end) => end,
                None => {
                    let read_from = buf_start + buf.len() as u64;
                    let remaining = file_size.saturating_sub(read_from);

                    if remaining > 0 {
                        buf.drain(..pos);
                        buf_start += pos as u64;
                        pos = 0;

                        let length = (self.chunk_size as u64).min(remaining) as usize;
                        let chunk = reader.read_range(read_from, length)?;
                        buf.extend_from_slice(&chunk);
                        continue;
                    }

                    if pos < buf.len() {
                        if !self.format.allows_unterminated_last() {
                            tracing::warn!(
                                path = %self.path.display(),
                                offset = buf_start + pos as u64,
                                bytes = buf.len() - pos,
                                format = self.format.name(),
                                "Ignoring incomplete record at end of file"
                            );
                            break;
                        }
                        buf.len()
                    } else {
                        break;
                    }
                }
            };

            if cursor.record >= first {
                records.push(self.format.payload(&buf[pos..end]).to_vec());
            }
            cursor.record += 1;
            cursor.offset = buf_start + end as u64;
            pos = end;
        }

        Ok(records)
    }
}

impl PageFetcher<Vec<u8>> for RecordPages {
    fn fetch(
        &self,
        request: PageRequest,
    ) -> std::result::Result<PageResult<Vec<u8>>, FetchFailure> {
        let records = self.read_page(request)?;
        Ok(PageResult::for_request(request, records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PagerError;
    use crate::records::format::{FixedSizeFormat, LengthPrefixedFormat, NewlineDelimitedFormat};
    use crate::storage::ObjectMeta;
    use std::collections::HashMap;
    use std::io::{Cursor, Read, Seek, SeekFrom};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// In-memory reader that counts range reads
    struct MockReader {
        data: Cursor<Vec<u8>>,
        size: u64,
        reads: Arc<AtomicUsize>,
    }

    impl StorageReader for MockReader {
        fn size(&self) -> u64 {
            self.size
        }

        fn read_range(&mut self, start: u64, length: usize) -> Result<Vec<u8>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.data
                .seek(SeekFrom::Start(start))
                .map_err(|e| PagerError::storage_with_source("mock", "seek failed", e))?;

            let mut buf = vec![0u8; length];
            self.data
                .read_exact(&mut buf)
                .map_err(|e| PagerError::storage_with_source("mock", "read failed", e))?;
            Ok(buf)
        }
    }

    /// In-memory storage backend
    struct MockStorage {
        files: Mutex<HashMap<PathBuf, Vec<u8>>>,
        reads: Arc<AtomicUsize>,
    }

    impl MockStorage {
        fn with_file(path: impl Into<PathBuf>, data: Vec<u8>) -> Arc<Self> {
            let mut files = HashMap::new();
            files.insert(path.into(), data);
            Arc::new(Self {
                files: Mutex::new(files),
                reads: Arc::new(AtomicUsize::new(0)),
            })
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    impl StorageBackend for MockStorage {
        fn metadata(&self, path: &Path) -> Result<ObjectMeta> {
            let files = self.files.lock().unwrap();
            let data = files
                .get(path)
                .ok_or_else(|| PagerError::storage(path, "not found"))?;

            Ok(ObjectMeta {
                size: data.len() as u64,
            })
        }

        fn open_read(&self, path: &Path) -> Result<Box<dyn StorageReader>> {
            let files = self.files.lock().unwrap();
            let data = files
                .get(path)
                .ok_or_else(|| PagerError::storage(path, "not found"))?
                .clone();

            let size = data.len() as u64;
            Ok(Box::new(MockReader {
                data: Cursor::new(data),
                size,
                reads: Arc::clone(&self.reads),
            }))
        }
    }

    fn lines(count: usize) -> Vec<u8> {
        (0..count)
            .map(|i| format!("record-{i}\n"))
            .collect::<String>()
            .into_bytes()
    }

    fn text(records: &[Vec<u8>]) -> Vec<String> {
        records
            .iter()
            .map(|r| String::from_utf8_lossy(r).into_owned())
            .collect()
    }

    #[test]
    fn test_pages_split_records() {
        let storage = MockStorage::with_file("data.txt", lines(7));
        let pages = RecordPages::new(
            storage,
            "data.txt",
            Arc::new(NewlineDelimitedFormat::new()),
            8,
        );

        let first = pages.read_page(PageRequest::new(0, 3)).unwrap();
        assert_eq!(text(&first), vec!["record-0", "record-1", "record-2"]);

        let second = pages.read_page(PageRequest::new(1, 3)).unwrap();
        assert_eq!(text(&second), vec!["record-3", "record-4", "record-5"]);

        // Last page is short, the one after it is empty
        let third = pages.read_page(PageRequest::new(2, 3)).unwrap();
        assert_eq!(text(&third), vec!["record-6"]);
        assert!(pages.read_page(PageRequest::new(3, 3)).unwrap().is_empty());
    }

    #[test]
    fn test_records_larger_than_chunk() {
        let mut data = Vec::new();
        data.extend_from_slice(&"x".repeat(100).into_bytes());
        data.push(b'\n');
        data.extend_from_slice(b"short\n");

        let storage = MockStorage::with_file("wide.txt", data);
        let pages = RecordPages::new(
            storage,
            "wide.txt",
            Arc::new(NewlineDelimitedFormat::new()),
            4,
        );

        let records = pages.read_page(PageRequest::new(0, 10)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].len(), 100);
        assert_eq!(records[1], b"short");
    }

    #[test]
    fn test_sequential_pages_do_not_rescan() {
        let storage = MockStorage::with_file("data.txt", lines(100));
        let pages = RecordPages::new(
            Arc::clone(&storage) as Arc<dyn StorageBackend>,
            "data.txt",
            Arc::new(NewlineDelimitedFormat::new()),
            1024 * 1024,
        );

        pages.read_page(PageRequest::new(0, 10)).unwrap();
        let after_first = storage.reads();
        let page = pages.read_page(PageRequest::new(1, 10)).unwrap();

        assert_eq!(text(&page)[0], "record-10");
        // The cursor sits after record 9, so page 1 needs one more read of
        // the rest of the file and no rescan of page 0.
        assert_eq!(storage.reads() - after_first, 1);
    }

    #[test]
    fn test_earlier_page_rewinds() {
        let storage = MockStorage::with_file("data.txt", lines(20));
        let pages = RecordPages::new(
            storage,
            "data.txt",
            Arc::new(NewlineDelimitedFormat::new()),
            16,
        );

        let later = pages.read_page(PageRequest::new(3, 5)).unwrap();
        assert_eq!(text(&later)[0], "record-15");

        let earlier = pages.read_page(PageRequest::new(1, 5)).unwrap();
        assert_eq!(
            text(&earlier),
            vec!["record-5", "record-6", "record-7", "record-8", "record-9"]
        );
    }

    #[test]
    fn test_unterminated_last_line() {
        let storage = MockStorage::with_file("data.txt", b"a\nb\nc".to_vec());
        let pages = RecordPages::new(
            storage,
            "data.txt",
            Arc::new(NewlineDelimitedFormat::new()),
            2,
        );

        let records = pages.read_page(PageRequest::new(0, 5)).unwrap();
        assert_eq!(text(&records), vec!["a", "b", "c"]);
        assert!(pages.read_page(PageRequest::new(1, 5)).unwrap().is_empty());
    }

    #[test]
    fn test_incomplete_fixed_record_dropped() {
        // Two whole 4-byte records and 2 trailing bytes
        let storage = MockStorage::with_file("data.bin", b"aaaabbbbcc".to_vec());
        let pages = RecordPages::new(storage, "data.bin", Arc::new(FixedSizeFormat::new(4)), 3);

        let records = pages.read_page(PageRequest::new(0, 10)).unwrap();
        assert_eq!(records, vec![b"aaaa".to_vec(), b"bbbb".to_vec()]);
    }

    #[test]
    fn test_length_prefixed_payloads() {
        let mut data = Vec::new();
        for payload in [&b"one"[..], b"", b"three"] {
            data.extend_from_slice(&(payload.len() as u32).to_be_bytes());
            data.extend_from_slice(payload);
        }

        let storage = MockStorage::with_file("data.bin", data);
        let pages = RecordPages::new(
            storage,
            "data.bin",
            Arc::new(LengthPrefixedFormat::new()),
            5,
        );

        let first = pages.read_page(PageRequest::new(0, 2)).unwrap();
        assert_eq!(first, vec![b"one".to_vec(), Vec::new()]);
        let second = pages.read_page(PageRequest::new(1, 2)).unwrap();
        assert_eq!(second, vec![b"three".to_vec()]);
    }

    #[test]
    fn test_missing_file_is_fetch_error() {
        let storage = MockStorage::with_file("data.txt", lines(1));
        let pages = RecordPages::new(
            storage,
            "other.txt",
            Arc::new(NewlineDelimitedFormat::new()),
            16,
        );

        let result: std::result::Result<PageResult<Vec<u8>>, _> =
            pages.fetch(PageRequest::new(0, 1));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_from_config_reads_local_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("data.txt"), lines(4)).unwrap();

        let config = StorageConfig {
            base_path: temp.path().to_path_buf(),
            buffer_size: 8,
            format: "newline".to_string(),
        };
        let pages = RecordPages::from_config(&config, "data.txt").unwrap();
        assert_eq!(pages.format_name(), "newline-delimited");

        let page = pages.fetch(PageRequest::new(1, 2)).unwrap();
        assert_eq!(page.index, 1);
        assert_eq!(text(&page.items), vec!["record-2", "record-3"]);
    }

    #[test]
    fn test_unaddressable_page_is_empty() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("data.txt"), lines(2)).unwrap();

        let config = StorageConfig {
            base_path: temp.path().to_path_buf(),
            ..Default::default()
        };
        let pages = RecordPages::from_config(&config, "data.txt").unwrap();

        // First record index overflows u64
        let page: PageResult<Vec<u8>> =
            pages.fetch(PageRequest::new(u64::MAX / 2, 4)).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.index, u64::MAX / 2);

        // The cursor is untouched and later pages still read normally
        let page = pages.fetch(PageRequest::new(0, 2)).unwrap();
        assert_eq!(text(&page.items), vec!["record-0", "record-1"]);
    }

    #[test]
    fn test_from_config_missing_file() {
        let temp = TempDir::new().unwrap();
        let config = StorageConfig {
            base_path: temp.path().to_path_buf(),
            ..Default::default()
        };

        let result = RecordPages::from_config(&config, "missing.txt");
        assert!(matches!(result, Err(PagerError::Storage { .. })));
    }

    #[test]
    fn test_from_config_unknown_format() {
        let temp = TempDir::new().unwrap();
        let config = StorageConfig {
            base_path: temp.path().to_path_buf(),
            format: "parquet".to_string(),
            ..Default::default()
        };

        let result = RecordPages::from_config(&config, "data.txt");
        assert!(matches!(result, Err(PagerError::Config { .. })));
    }
}
