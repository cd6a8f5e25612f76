//! Heap File - one table's tuples, stored as a sequence of fixed-size pages.
//!
//! The [`HeapFile`] handles all direct file operations for a table:
//! - Reading and writing pages by position
//! - Appending empty pages (the file only ever grows)
//! - Tuple insert and delete, routed through the buffer pool

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, trace};
use parking_lot::Mutex;

use crate::buffer::{BufferPool, PageRef};
use crate::common::{Error, PageId, RecordId, Result, TableId, TransactionId};
use crate::concurrency::LockMode;
use crate::storage::page::HeapPage;
use crate::storage::tuple::{Tuple, TupleDesc};

/// Pages of one table, laid out back to back in a single file.
///
/// # File Layout
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0    page_size  2×page_size  ...  N×page_size
/// ```
///
/// # Thread Safety
/// The file handle sits behind a `Mutex`; every seek+read or seek+write
/// pair happens under one lock acquisition.
///
/// # Durability
/// Page writes and appends are followed by `fsync()`. The buffer pool forces
/// the write-ahead log before it calls [`HeapFile::write_page`].
#[derive(Debug)]
pub struct HeapFile {
    table_id: TableId,
    path: PathBuf,
    desc: Arc<TupleDesc>,
    page_size: usize,
    file: Mutex<File>,
}

impl HeapFile {
    /// Open the heap file at `path`, creating an empty one if it doesn't exist.
    pub fn open<P: AsRef<Path>>(
        path: P,
        table_id: TableId,
        desc: Arc<TupleDesc>,
        page_size: usize,
    ) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())?;

        Ok(Self {
            table_id,
            path: path.as_ref().to_path_buf(),
            desc,
            page_size,
            file: Mutex::new(file),
        })
    }

    #[inline]
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of pages: the file size divided by the page size, rounded up.
    pub fn num_pages(&self) -> Result<u32> {
        let file = self.file.lock();
        self.pages_in(&file)
    }

    fn pages_in(&self, file: &File) -> Result<u32> {
        let len = file.metadata()?.len();
        Ok(len.div_ceil(self.page_size as u64) as u32)
    }

    fn check_range(&self, page_id: PageId, num_pages: u32) -> Result<()> {
        if page_id.table_id != self.table_id || page_id.page_no >= num_pages {
            return Err(Error::InvalidPageReference { page_id, num_pages });
        }
        Ok(())
    }

    /// Read and decode a page.
    ///
    /// A short final page (file size not a multiple of the page size) reads
    /// as if zero-padded.
    ///
    /// # Errors
    /// - `Error::InvalidPageReference` if the page is past the end of the file
    /// - `Error::Io` / `Error::CorruptPage` on read or decode failure
    pub fn read_page(&self, page_id: PageId) -> Result<HeapPage> {
        let mut data = vec![0u8; self.page_size];
        {
            let mut file = self.file.lock();
            let num_pages = self.pages_in(&file)?;
            self.check_range(page_id, num_pages)?;

            file.seek(SeekFrom::Start(page_id.offset(self.page_size)))?;
            let mut filled = 0;
            while filled < data.len() {
                let n = file.read(&mut data[filled..])?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
        }
        trace!("read {} from {}", page_id, self.path.display());

        HeapPage::from_bytes(page_id, Arc::clone(&self.desc), &data)
    }

    /// Overwrite a page in place with `data` (exactly one page of bytes).
    ///
    /// # Errors
    /// Returns `Error::InvalidPageReference` if the page hasn't been appended.
    pub fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        if data.len() != self.page_size {
            return Err(Error::CorruptPage(
                page_id,
                format!("{} bytes written to a {}-byte page", data.len(), self.page_size),
            ));
        }

        let mut file = self.file.lock();
        let num_pages = self.pages_in(&file)?;
        self.check_range(page_id, num_pages)?;

        file.seek(SeekFrom::Start(page_id.offset(self.page_size)))?;
        file.write_all(data)?;
        file.sync_data()?;
        trace!("wrote {} to {}", page_id, self.path.display());

        Ok(())
    }

    /// Append one zero-filled page and return its page number.
    ///
    /// The page number is computed under the file lock, so two concurrent
    /// appenders each get the page they wrote.
    pub fn append_empty_page(&self) -> Result<u32> {
        let mut file = self.file.lock();
        let page_no = self.pages_in(&file)?;
        let page_id = PageId::new(self.table_id, page_no);

        file.seek(SeekFrom::Start(page_id.offset(self.page_size)))?;
        file.write_all(&HeapPage::empty_page_data(self.page_size))?;
        file.sync_all()?;
        debug!("appended {} to {}", page_id, self.path.display());

        Ok(page_no)
    }

    /// Insert `tuple` on behalf of `tid`.
    ///
    /// Scans pages in order, fetching each through the buffer pool with an
    /// exclusive lock, and uses the first with a free slot. When every page
    /// is full a new page is appended and used instead.
    ///
    /// Returns the tuple's new location and the still-pinned page it
    /// dirtied; the buffer pool marks it dirty before releasing the pin.
    pub fn insert_tuple<'a>(
        &self,
        pool: &'a BufferPool,
        tid: TransactionId,
        tuple: Tuple,
    ) -> Result<(RecordId, Vec<PageRef<'a>>)> {
        self.desc.validate(&tuple)?;

        for page_no in 0..self.num_pages()? {
            let page_id = PageId::new(self.table_id, page_no);
            let page_ref = pool.get_page(tid, page_id, LockMode::Exclusive)?;
            let mut page = page_ref.write()?;
            if page.num_empty_slots() > 0 {
                let record_id = page.insert_tuple(tuple)?;
                drop(page);
                return Ok((record_id, vec![page_ref]));
            }
        }

        let page_no = self.append_empty_page()?;
        let page_id = PageId::new(self.table_id, page_no);
        let page_ref = pool.get_page(tid, page_id, LockMode::Exclusive)?;
        let record_id = page_ref.write()?.insert_tuple(tuple)?;

        Ok((record_id, vec![page_ref]))
    }

    /// Delete `tuple` (located by its record id) on behalf of `tid`.
    ///
    /// # Errors
    /// - `Error::TupleNotFound` if the tuple has no record id or its slot is free
    /// - `Error::InvalidPageReference` if the record id points outside this file
    pub fn delete_tuple<'a>(
        &self,
        pool: &'a BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<PageRef<'a>>> {
        let record_id = tuple.record_id().ok_or(Error::TupleNotFound)?;
        self.check_range(record_id.page_id, self.num_pages()?)?;

        let page_ref = pool.get_page(tid, record_id.page_id, LockMode::Exclusive)?;
        page_ref.write()?.delete_tuple(tuple)?;

        Ok(vec![page_ref])
    }

    /// Iterate over every live tuple, page by page, under shared locks.
    pub fn scan<'a>(self: &Arc<Self>, pool: &'a BufferPool, tid: TransactionId) -> HeapScan<'a> {
        HeapScan {
            file: Arc::clone(self),
            pool,
            tid,
            next_page: 0,
            buffered: Vec::new().into_iter(),
            done: false,
        }
    }
}

/// Sequential scan over a [`HeapFile`].
///
/// Each page is fetched with [`LockMode::Shared`] and its tuples copied
/// out, so no page stays pinned between calls to `next`. The first error
/// ends the scan.
pub struct HeapScan<'a> {
    file: Arc<HeapFile>,
    pool: &'a BufferPool,
    tid: TransactionId,
    next_page: u32,
    buffered: std::vec::IntoIter<Tuple>,
    done: bool,
}

impl HeapScan<'_> {
    fn load_next_page(&mut self) -> Result<bool> {
        if self.next_page >= self.file.num_pages()? {
            return Ok(false);
        }

        let page_id = PageId::new(self.file.table_id, self.next_page);
        let page_ref = self.pool.get_page(self.tid, page_id, LockMode::Shared)?;
        let tuples: Vec<Tuple> = page_ref.read().tuples().cloned().collect();
        self.buffered = tuples.into_iter();
        self.next_page += 1;
        Ok(true)
    }
}

impl Iterator for HeapScan<'_> {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(tuple) = self.buffered.next() {
                return Some(Ok(tuple));
            }
            if self.done {
                return None;
            }
            match self.load_next_page() {
                Ok(true) => {}
                Ok(false) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tuple::{Field, FieldType};
    use tempfile::tempdir;

    const PAGE_SIZE: usize = 128;

    fn open_file(dir: &tempfile::TempDir) -> HeapFile {
        let desc = Arc::new(TupleDesc::from_types(&[FieldType::Int, FieldType::Int]));
        HeapFile::open(dir.path().join("t.dat"), 1, desc, PAGE_SIZE).unwrap()
    }

    #[test]
    fn test_new_file_is_empty() {
        let dir = tempdir().unwrap();
        let file = open_file(&dir);
        assert_eq!(file.num_pages().unwrap(), 0);
        assert_eq!(file.table_id(), 1);
    }

    #[test]
    fn test_append_returns_sequential_page_numbers() {
        let dir = tempdir().unwrap();
        let file = open_file(&dir);

        assert_eq!(file.append_empty_page().unwrap(), 0);
        assert_eq!(file.append_empty_page().unwrap(), 1);
        assert_eq!(file.num_pages().unwrap(), 2);

        let page = file.read_page(PageId::new(1, 1)).unwrap();
        assert_eq!(page.num_empty_slots(), page.num_slots());
    }

    #[test]
    fn test_write_and_read_page() {
        let dir = tempdir().unwrap();
        let file = open_file(&dir);
        file.append_empty_page().unwrap();

        let pid = PageId::new(1, 0);
        let mut page = file.read_page(pid).unwrap();
        page.insert_tuple(Tuple::new(vec![Field::Int(7), Field::Int(8)]))
            .unwrap();
        file.write_page(pid, &page.to_bytes()).unwrap();

        let reread = file.read_page(pid).unwrap();
        let tuples: Vec<&Tuple> = reread.tuples().collect();
        assert_eq!(tuples.len(), 1);
        assert_eq!(tuples[0].fields(), &[Field::Int(7), Field::Int(8)]);
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = tempdir().unwrap();
        let pid = PageId::new(1, 0);
        {
            let file = open_file(&dir);
            file.append_empty_page().unwrap();
            let mut page = file.read_page(pid).unwrap();
            page.insert_tuple(Tuple::new(vec![Field::Int(1), Field::Int(2)]))
                .unwrap();
            file.write_page(pid, &page.to_bytes()).unwrap();
        }

        let file = open_file(&dir);
        assert_eq!(file.num_pages().unwrap(), 1);
        assert_eq!(file.read_page(pid).unwrap().tuples().count(), 1);
    }

    #[test]
    fn test_num_pages_rounds_up_partial_page() {
        let dir = tempdir().unwrap();
        let file = open_file(&dir);
        file.append_empty_page().unwrap();
        {
            let mut raw = file.file.lock();
            raw.seek(SeekFrom::End(0)).unwrap();
            raw.write_all(&[0u8; 10]).unwrap();
        }
        assert_eq!(file.num_pages().unwrap(), 2);

        // The short page reads as zero-padded
        let page = file.read_page(PageId::new(1, 1)).unwrap();
        assert_eq!(page.tuples().count(), 0);
    }

    #[test]
    fn test_read_invalid_page() {
        let dir = tempdir().unwrap();
        let file = open_file(&dir);
        file.append_empty_page().unwrap();

        assert!(matches!(
            file.read_page(PageId::new(1, 1)),
            Err(Error::InvalidPageReference { num_pages: 1, .. })
        ));
        // Page of a different table
        assert!(matches!(
            file.read_page(PageId::new(2, 0)),
            Err(Error::InvalidPageReference { .. })
        ));
    }

    #[test]
    fn test_write_invalid_page() {
        let dir = tempdir().unwrap();
        let file = open_file(&dir);

        let data = HeapPage::empty_page_data(PAGE_SIZE);
        assert!(matches!(
            file.write_page(PageId::new(1, 0), &data),
            Err(Error::InvalidPageReference { .. })
        ));
    }

    #[test]
    fn test_write_wrong_size() {
        let dir = tempdir().unwrap();
        let file = open_file(&dir);
        file.append_empty_page().unwrap();

        assert!(file.write_page(PageId::new(1, 0), &[0u8; 3]).is_err());
    }
}
