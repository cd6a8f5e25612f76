//! Error types for heapstore.

use thiserror::Error;

use crate::common::{PageId, TableId, TransactionId};

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in heapstore.
///
/// A single error type keeps handling uniform between the storage file,
/// the lock manager and the buffer pool. "Lock not yet granted" is not an
/// error: [`LockManager::try_acquire`](crate::concurrency::LockManager::try_acquire)
/// reports it as `Ok(false)` and the blocking path simply waits.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from a storage file or the write-ahead log.
    ///
    /// On a failed read the cache is left untouched; on a failed flush the
    /// page keeps its dirty marker so a later flush retries.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Granting the lock would close a cycle in the wait-for graph.
    ///
    /// The requesting transaction must abort.
    #[error("transaction {tid} aborted: deadlock while waiting for {page_id}")]
    Deadlock { tid: TransactionId, page_id: PageId },

    /// A page number outside the file's current range.
    #[error("invalid page reference {page_id}: file has {num_pages} pages")]
    InvalidPageReference { page_id: PageId, num_pages: u32 },

    /// The eviction strategy produced no resident, unpinned victim.
    #[error("no evictable page in buffer pool")]
    NoEvictablePage,

    /// The catalog has no table with this id.
    #[error("unknown table {0}")]
    UnknownTable(TableId),

    /// A tuple does not fit the table's descriptor.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Every slot on the page is occupied.
    #[error("{0} has no free slot")]
    PageFull(PageId),

    /// The tuple to delete is not stored where its record id says.
    #[error("tuple not found")]
    TupleNotFound,

    /// Write access requested through a page fetched in shared mode.
    #[error("{0} was fetched without an exclusive lock")]
    LockModeViolation(PageId),

    /// Page bytes could not be decoded.
    #[error("corrupt page {0}: {1}")]
    CorruptPage(PageId, String),

    /// A log record failed its checksum or is truncated.
    #[error("corrupt log: {0}")]
    CorruptLog(String),
}

impl Error {
    /// Whether the transaction that received this error must stop and abort.
    pub fn is_transaction_aborted(&self) -> bool {
        matches!(self, Error::Deadlock { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidPageReference {
            page_id: PageId::new(3, 9),
            num_pages: 4,
        };
        assert_eq!(
            format!("{}", err),
            "invalid page reference Page(3:9): file has 4 pages"
        );

        let err = Error::NoEvictablePage;
        assert_eq!(format!("{}", err), "no evictable page in buffer pool");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_deadlock_aborts_transaction() {
        let err = Error::Deadlock {
            tid: TransactionId::new(7),
            page_id: PageId::new(1, 0),
        };
        assert!(err.is_transaction_aborted());
        assert!(!Error::TupleNotFound.is_transaction_aborted());
    }
}
