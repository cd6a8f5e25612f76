//! Log File - checksummed, append-only write-ahead log on disk.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, trace};
use parking_lot::Mutex;

use crate::common::{Error, PageId, Result, TransactionId};
use crate::recovery::WriteAheadLog;

/// Size of the `[crc32][body_len]` prefix of every record.
const RECORD_HEADER_SIZE: usize = 8;

/// One decoded log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub tid: TransactionId,
    pub page_id: PageId,
    pub before: Vec<u8>,
    pub after: Vec<u8>,
}

impl LogRecord {
    fn encode_body(tid: TransactionId, page_id: PageId, before: &[u8], after: &[u8]) -> Vec<u8> {
        let mut body = Vec::with_capacity(24 + before.len() + after.len());
        body.extend_from_slice(&tid.0.to_le_bytes());
        body.extend_from_slice(&page_id.table_id.to_le_bytes());
        body.extend_from_slice(&page_id.page_no.to_le_bytes());
        body.extend_from_slice(&(before.len() as u32).to_le_bytes());
        body.extend_from_slice(before);
        body.extend_from_slice(&(after.len() as u32).to_le_bytes());
        body.extend_from_slice(after);
        body
    }

    fn decode_body(body: &[u8]) -> Result<Self> {
        let mut reader = BodyReader { body, pos: 0 };
        let tid = TransactionId::new(u64::from_le_bytes(reader.array()?));
        let table_id = u32::from_le_bytes(reader.array()?);
        let page_no = u32::from_le_bytes(reader.array()?);
        let before_len = u32::from_le_bytes(reader.array()?) as usize;
        let before = reader.take(before_len)?.to_vec();
        let after_len = u32::from_le_bytes(reader.array()?) as usize;
        let after = reader.take(after_len)?.to_vec();
        if reader.pos != body.len() {
            return Err(Error::CorruptLog(format!(
                "{} trailing bytes in record body",
                body.len() - reader.pos
            )));
        }

        Ok(Self {
            tid,
            page_id: PageId::new(table_id, page_no),
            before,
            after,
        })
    }
}

struct BodyReader<'a> {
    body: &'a [u8],
    pos: usize,
}

impl<'a> BodyReader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.body.len())
            .ok_or_else(|| Error::CorruptLog("record body truncated".to_string()))?;
        let bytes = &self.body[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

/// Append-only log of before/after page images.
///
/// # Record Format
/// ```text
/// ┌───────────┬──────────────┬──────────────────────────────────────────┐
/// │ crc32 u32 │ body_len u32 │ body                                     │
/// └───────────┴──────────────┴──────────────────────────────────────────┘
/// body: tid u64 │ table_id u32 │ page_no u32 │
///       before_len u32 │ before │ after_len u32 │ after
/// ```
/// All integers little-endian; the checksum covers the body only.
///
/// # Durability
/// [`log_write`](WriteAheadLog::log_write) only fills an in-memory buffer.
/// [`force`](WriteAheadLog::force) drains it and `fsync`s the file.
#[derive(Debug)]
pub struct LogFile {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
    records_written: AtomicU64,
}

impl LogFile {
    /// Open the log at `path` for appending, creating it if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        debug!("opened log {}", path.as_ref().display());

        Ok(Self {
            path: path.as_ref().to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
            records_written: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended through this handle.
    pub fn records_written(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    /// Decode and verify every record in the log at `path`.
    ///
    /// # Errors
    /// `Error::CorruptLog` on a checksum mismatch or a truncated record.
    pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<LogRecord>> {
        let mut data = Vec::new();
        File::open(path.as_ref())?.read_to_end(&mut data)?;

        let mut records = Vec::new();
        let mut offset = 0;
        while offset < data.len() {
            if data.len() - offset < RECORD_HEADER_SIZE {
                return Err(Error::CorruptLog(format!(
                    "truncated record header at offset {}",
                    offset
                )));
            }
            let crc = u32::from_le_bytes([
                data[offset],
                data[offset + 1],
                data[offset + 2],
                data[offset + 3],
            ]);
            let len = u32::from_le_bytes([
                data[offset + 4],
                data[offset + 5],
                data[offset + 6],
                data[offset + 7],
            ]) as usize;

            let start = offset + RECORD_HEADER_SIZE;
            if data.len() - start < len {
                return Err(Error::CorruptLog(format!(
                    "truncated record body at offset {}",
                    offset
                )));
            }
            let body = &data[start..start + len];
            if crc32fast::hash(body) != crc {
                return Err(Error::CorruptLog(format!(
                    "checksum mismatch at offset {}",
                    offset
                )));
            }

            records.push(LogRecord::decode_body(body)?);
            offset = start + len;
        }

        Ok(records)
    }
}

impl WriteAheadLog for LogFile {
    fn log_write(
        &self,
        tid: TransactionId,
        page_id: PageId,
        before: &[u8],
        after: &[u8],
    ) -> Result<()> {
        let body = LogRecord::encode_body(tid, page_id, before, after);
        let crc = crc32fast::hash(&body);

        let mut writer = self.writer.lock();
        writer.write_all(&crc.to_le_bytes())?;
        writer.write_all(&(body.len() as u32).to_le_bytes())?;
        writer.write_all(&body)?;
        drop(writer);

        self.records_written.fetch_add(1, Ordering::Relaxed);
        trace!("logged {} for {}", page_id, tid);
        Ok(())
    }

    fn force(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.flush()?;
        writer.get_ref().sync_data()?;
        Ok(())
    }
}
