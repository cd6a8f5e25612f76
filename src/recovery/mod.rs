//! Write-ahead logging.
//!
//! The buffer pool never writes a dirty page to its heap file before the
//! matching log record is durable:
//!
//! ```text
//! log_write(tid, page, before, after) ──▶ force() ──▶ HeapFile::write_page
//! ```
//!
//! - [`WriteAheadLog`] - The contract the buffer pool writes through
//! - [`LogFile`] - Checksummed append-only log on disk
//!
//! Replaying the log on restart is not implemented.

mod log_file;

pub use log_file::{LogFile, LogRecord};

use crate::common::{PageId, Result, TransactionId};

/// Durable log of page images, written ahead of the pages themselves.
pub trait WriteAheadLog: Send + Sync {
    /// Append a record of `tid` changing `page_id` from `before` to `after`.
    ///
    /// The record need not be durable until [`force`](Self::force) returns.
    fn log_write(
        &self,
        tid: TransactionId,
        page_id: PageId,
        before: &[u8],
        after: &[u8],
    ) -> Result<()>;

    /// Make every record appended so far durable.
    fn force(&self) -> Result<()>;
}
