//! Transaction handle.

use log::{debug, error, warn};

use crate::buffer::{BufferPool, PageRef};
use crate::common::{PageId, RecordId, Result, TableId, TransactionId};
use crate::concurrency::LockMode;
use crate::storage::{HeapScan, Tuple};

/// A running transaction.
///
/// Every operation runs under the transaction's id. Finishing consumes the
/// handle; a handle dropped while still active aborts, so a `?` that bails
/// out of a unit of work never leaves locks or dirty pages behind.
///
/// # Example
/// ```no_run
/// # use heapstore::{Database, DatabaseConfig, Field, Tuple, TupleDesc, FieldType};
/// # use heapstore::recovery::LogFile;
/// # use std::sync::Arc;
/// # fn main() -> heapstore::Result<()> {
/// let log = Arc::new(LogFile::create("db.log")?);
/// let db = Database::new(DatabaseConfig::default(), log);
/// let table = db
///     .catalog()
///     .create_table("t", "t.dat", TupleDesc::from_types(&[FieldType::Int]))?;
///
/// let txn = db.begin();
/// txn.insert_tuple(table, Tuple::new(vec![Field::Int(5)]))?;
/// txn.commit()?;
/// # Ok(())
/// # }
/// ```
pub struct Transaction<'a> {
    pool: &'a BufferPool,
    id: TransactionId,
    active: bool,
}

impl<'a> Transaction<'a> {
    /// Start a transaction with a fresh id.
    pub fn begin(pool: &'a BufferPool) -> Self {
        let id = TransactionId::next();
        debug!("begin {}", id);
        Self {
            pool,
            id,
            active: true,
        }
    }

    #[inline]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn get_page(&self, page_id: PageId, mode: LockMode) -> Result<PageRef<'a>> {
        self.pool.get_page(self.id, page_id, mode)
    }

    pub fn insert_tuple(&self, table_id: TableId, tuple: Tuple) -> Result<RecordId> {
        self.pool.insert_tuple(self.id, table_id, tuple)
    }

    pub fn delete_tuple(&self, tuple: &Tuple) -> Result<()> {
        self.pool.delete_tuple(self.id, tuple)
    }

    /// Scan every live tuple of a table under shared locks.
    pub fn scan(&self, table_id: TableId) -> Result<HeapScan<'a>> {
        self.pool.scan(self.id, table_id)
    }

    /// Flush this transaction's pages and release its locks.
    ///
    /// If the flush fails the transaction is aborted instead and the flush
    /// error is returned.
    pub fn commit(mut self) -> Result<()> {
        self.active = false;
        if let Err(e) = self.pool.transaction_complete(self.id, true) {
            warn!("commit of {} failed, aborting: {}", self.id, e);
            if let Err(abort_err) = self.pool.transaction_complete(self.id, false) {
                error!("abort of {} after failed commit: {}", self.id, abort_err);
            }
            return Err(e);
        }
        debug!("committed {}", self.id);
        Ok(())
    }

    /// Throw away this transaction's changes and release its locks.
    pub fn abort(mut self) -> Result<()> {
        self.active = false;
        self.pool.transaction_complete(self.id, false)?;
        debug!("aborted {}", self.id);
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.active {
            if let Err(e) = self.pool.transaction_complete(self.id, false) {
                error!("implicit abort of {} failed: {}", self.id, e);
            }
        }
    }
}
