//! File-backed record store with an in-memory offset index.
//!
//! The file is the system of record. The index holds the end offset of every
//! record and is rewritten alongside the bytes on each mutation, so reads can
//! seek straight to a record without scanning.

use crate::domain::error::StoreError;
use crate::domain::offset_index::OffsetIndex;
use crate::domain::record_codec::{self, LineEnding};
use crate::ports::indexed_access::IndexedAccess;
use crate::ports::record_cursor::RecordCursor;
use crate::ports::size_query::SizeQuery;
use csv::StringRecord;
use std::borrow::Borrow;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// An offset-indexed store over one delimited text file.
///
/// Reads take `&self`; anything that rewrites bytes takes `&mut self`. The
/// file handle is closed when the store is dropped.
///
/// # Example
///
/// ```no_run
/// use csv::StringRecord;
/// use recstore::adapters::file_store::RecordStore;
/// use recstore::ports::indexed_access::IndexedAccess;
///
/// let mut store = RecordStore::open("prices.csv").unwrap();
/// let pos = store.set(None, &StringRecord::from(vec!["BHP", "45.10"])).unwrap();
/// let record = store.get(pos).unwrap().unwrap();
/// assert_eq!(&record[0], "BHP");
/// ```
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    file: File,
    index: OffsetIndex,
    ending: LineEnding,
    cursor: usize,
}

impl RecordStore {
    /// Opens or creates the record file at `path` and indexes it.
    ///
    /// Existing records are never lost. Blank lines are dropped and a final
    /// record missing its line terminator gets one, in the file's own line
    /// ending (`\n` or `\r\n`, taken from the first record). Later writes use
    /// the same ending.
    ///
    /// # Errors
    ///
    /// [`StoreError::Configuration`] if the parent directory does not exist,
    /// [`StoreError::Resource`] if the file cannot be opened or read, or if its
    /// last record never closes a quoted field.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        check_parent(path)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| StoreError::resource(format!("failed to open {}", path.display()), e))?;

        let mut store = Self {
            path: path.to_path_buf(),
            file,
            index: OffsetIndex::new(),
            ending: LineEnding::Lf,
            cursor: 0,
        };
        store.load()?;

        debug!(
            path = %store.path.display(),
            records = store.index.len(),
            bytes = store.index.end(),
            ending = ?store.ending,
            "opened record store"
        );
        Ok(store)
    }

    /// Like [`RecordStore::open`], creating missing parent directories first.
    pub fn open_with_create_dirs<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                StoreError::resource(format!("failed to create {}", parent.display()), e)
            })?;
        }
        Self::open(path)
    }

    /// Line ending used for records written by this store.
    pub fn line_ending(&self) -> LineEnding {
        self.ending
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The underlying file handle, for inspection.
    pub fn file(&self) -> &File {
        &self.file
    }

    /// End offset of every record, in file order.
    ///
    /// Each span is exactly one encoded record, terminator included.
    pub fn index(&self) -> &[u64] {
        self.index.as_slice()
    }

    /// Rescans the whole file and replaces the index.
    ///
    /// Use after a failed mutation to bring the index back in line with
    /// whatever reached the disk.
    pub fn reindex(&mut self) -> Result<&[u64], StoreError> {
        self.seek_to(0)?;
        let offsets = record_codec::scan_offsets(&self.file).map_err(|e| {
            StoreError::resource(format!("failed to index {}", self.path.display()), e)
        })?;
        self.index = OffsetIndex::from_offsets(offsets);
        debug!(records = self.index.len(), "rebuilt index");
        Ok(self.index.as_slice())
    }

    /// Replaces the whole file with `header` (if any) followed by `records`.
    ///
    /// The index is built as rows are written and returned. On a write
    /// failure the file is left partial and the index empty; call
    /// [`RecordStore::reindex`] to recover. The cursor is rewound.
    pub fn import_data<I>(
        &mut self,
        records: I,
        header: Option<&StringRecord>,
    ) -> Result<&[u64], StoreError>
    where
        I: IntoIterator,
        I::Item: Borrow<StringRecord>,
    {
        self.index = OffsetIndex::new();
        self.cursor = 0;
        self.truncate(0)?;
        self.seek_to(0)?;

        let mut index = OffsetIndex::new();
        let mut writer = BufWriter::new(&self.file);
        if let Some(header) = header {
            write_row(&mut writer, &mut index, header, self.ending)?;
        }
        for record in records {
            write_row(&mut writer, &mut index, record.borrow(), self.ending)?;
        }
        writer
            .flush()
            .map_err(|e| StoreError::resource("failed to flush import", e))?;
        drop(writer);

        info!(
            path = %self.path.display(),
            records = index.len(),
            bytes = index.end(),
            "imported records"
        );
        self.index = index;
        Ok(self.index.as_slice())
    }

    /// Flushes file contents and metadata to disk.
    pub fn sync(&self) -> Result<(), StoreError> {
        self.file
            .sync_all()
            .map_err(|e| StoreError::resource("failed to sync", e))
    }

    /// Iterates every record in order, independent of the cursor.
    pub fn iter(&self) -> Records<'_> {
        Records {
            store: self,
            position: 0,
        }
    }

    fn read_record(&self, position: usize) -> Result<Option<StringRecord>, StoreError> {
        if !self.index.contains(position) {
            return Ok(None);
        }
        let start = self.index.start_of(position);
        let mut buf = vec![0u8; self.index.span(position) as usize];
        self.read_exact_at(start, &mut buf)?;

        match record_codec::decode(&buf)
            .map_err(|e| StoreError::resource(format!("failed to decode record {position}"), e))?
        {
            Some(record) => Ok(Some(record)),
            None => Err(StoreError::Resource {
                reason: format!("no record at offset {start}"),
            }),
        }
    }

    fn append_bytes(&mut self, bytes: &[u8]) -> Result<usize, StoreError> {
        let offset = self.index.end();
        self.write_at(offset, bytes)?;
        let end = self.index.push_len(bytes.len() as u64);
        let position = self.index.len() - 1;
        debug!(position, offset, end, "appended record");
        Ok(position)
    }

    /// Rewrites the record at `position`, relocating everything after it.
    fn replace(&mut self, position: usize, bytes: &[u8]) -> Result<(), StoreError> {
        let start = self.index.start_of(position);
        let end = self.index.end_of(position);
        let new_len = bytes.len() as u64;

        if new_len == end - start {
            self.write_at(start, bytes)?;
            debug!(position, start, "updated record in place");
            return Ok(());
        }

        let tail = self.read_from(end)?;
        self.write_at(start, bytes)?;
        self.write_at(start + new_len, &tail)?;
        self.truncate(start + new_len + tail.len() as u64)?;

        let delta = self.index.splice(position, new_len);
        debug!(position, start, delta, tail = tail.len(), "updated record");
        Ok(())
    }

    fn remove(&mut self, position: usize) -> Result<(), StoreError> {
        let start = self.index.start_of(position);
        let end = self.index.end_of(position);

        let tail = self.read_from(end)?;
        self.write_at(start, &tail)?;
        self.truncate(start + tail.len() as u64)?;

        let removed = self.index.remove(position);
        debug!(position, start, removed, "deleted record");
        Ok(())
    }

    /// Indexes the whole file, rewriting it first if it holds blank lines or
    /// an unterminated last record.
    fn load(&mut self) -> Result<(), StoreError> {
        let bytes = self.read_from(0)?;
        let offsets = record_codec::scan_offsets(bytes.as_slice()).map_err(|e| {
            StoreError::resource(format!("failed to index {}", self.path.display()), e)
        })?;
        let tidied = record_codec::tidy(&bytes, &offsets)
            .map_err(|e| StoreError::resource(self.path.display(), e))?;

        if tidied.changed() {
            warn!(
                path = %self.path.display(),
                blank_bytes = tidied.dropped,
                terminated_last = tidied.terminated_last,
                "rewriting record file"
            );
            self.write_at(0, &tidied.bytes)?;
            self.truncate(tidied.bytes.len() as u64)?;
        }
        self.ending = tidied.ending;
        self.index = OffsetIndex::from_offsets(tidied.offsets);
        Ok(())
    }

    fn range_error(&self, position: usize) -> StoreError {
        StoreError::Range {
            position,
            count: self.index.len(),
        }
    }

    fn seek_to(&self, offset: u64) -> Result<(), StoreError> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| StoreError::resource(format!("failed to seek to {offset}"), e))?;
        Ok(())
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), StoreError> {
        self.seek_to(offset)?;
        let mut file = &self.file;
        file.read_exact(buf).map_err(|e| {
            StoreError::resource(format!("failed to read {} bytes at {offset}", buf.len()), e)
        })
    }

    fn read_from(&self, offset: u64) -> Result<Vec<u8>, StoreError> {
        self.seek_to(offset)?;
        let mut file = &self.file;
        let mut tail = Vec::new();
        file.read_to_end(&mut tail)
            .map_err(|e| StoreError::resource(format!("failed to read from {offset}"), e))?;
        Ok(tail)
    }

    fn write_at(&self, offset: u64, bytes: &[u8]) -> Result<(), StoreError> {
        self.seek_to(offset)?;
        let mut file = &self.file;
        file.write_all(bytes)
            .map_err(|e| StoreError::resource(format!("failed to write at {offset}"), e))
    }

    fn truncate(&self, len: u64) -> Result<(), StoreError> {
        self.file
            .set_len(len)
            .map_err(|e| StoreError::resource(format!("failed to truncate to {len}"), e))
    }

}

fn check_parent(path: &Path) -> Result<(), StoreError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            Err(StoreError::Configuration {
                reason: format!("directory {} does not exist", parent.display()),
            })
        }
        _ => Ok(()),
    }
}

fn encode(record: &StringRecord, ending: LineEnding) -> Result<Vec<u8>, StoreError> {
    record_codec::encode(record, ending)
        .map_err(|e| StoreError::resource("failed to encode record", e))
}

fn write_row<W: Write>(
    writer: &mut W,
    index: &mut OffsetIndex,
    record: &StringRecord,
    ending: LineEnding,
) -> Result<(), StoreError> {
    let bytes = encode(record, ending)?;
    writer.write_all(&bytes).map_err(|e| {
        StoreError::resource(format!("failed to write row {}", index.len()), e)
    })?;
    index.push_len(bytes.len() as u64);
    Ok(())
}

impl SizeQuery for RecordStore {
    fn count(&self) -> usize {
        self.index.len()
    }
}

impl IndexedAccess for RecordStore {
    fn contains(&self, position: usize) -> bool {
        self.index.contains(position)
    }

    fn get(&self, position: usize) -> Result<Option<StringRecord>, StoreError> {
        self.read_record(position)
    }

    fn set(
        &mut self,
        position: Option<usize>,
        record: &StringRecord,
    ) -> Result<usize, StoreError> {
        let bytes = encode(record, self.ending)?;
        match position {
            Some(position) if self.index.contains(position) => {
                self.replace(position, &bytes)?;
                Ok(position)
            }
            _ => self.append_bytes(&bytes),
        }
    }

    fn unset(&mut self, position: usize) -> Result<(), StoreError> {
        if !self.index.contains(position) {
            return Err(self.range_error(position));
        }
        self.remove(position)
    }
}

impl RecordCursor for RecordStore {
    fn seek(&mut self, position: usize) -> Result<(), StoreError> {
        if !self.index.contains(position) {
            return Err(self.range_error(position));
        }
        self.cursor = position;
        Ok(())
    }

    fn current(&self) -> Result<Option<StringRecord>, StoreError> {
        self.read_record(self.cursor)
    }

    fn next(&mut self) {
        self.cursor = self.cursor.saturating_add(1);
    }

    fn rewind(&mut self) {
        self.cursor = 0;
    }

    fn valid(&self) -> bool {
        self.index.contains(self.cursor)
    }

    fn key(&self) -> usize {
        self.cursor
    }
}

/// Iterator over every record of a [`RecordStore`], by position.
pub struct Records<'a> {
    store: &'a RecordStore,
    position: usize,
}

impl Iterator for Records<'_> {
    type Item = Result<StringRecord, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        let position = self.position;
        self.position += 1;
        self.store.read_record(position).transpose()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.store.index.len().saturating_sub(self.position);
        (left, Some(left))
    }
}

impl<'a> IntoIterator for &'a RecordStore {
    type Item = Result<StringRecord, StoreError>;
    type IntoIter = Records<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
