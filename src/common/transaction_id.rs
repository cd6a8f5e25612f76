//! Transaction identifier type.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies a transaction.
///
/// Ids handed out by [`TransactionId::next`] are unique for the life of the
/// process. A transaction owns no state beyond its id: the locks it holds
/// live in the lock table and the pages it dirtied are tagged in the cache.
///
/// # Example
/// ```
/// use heapstore::TransactionId;
///
/// let a = TransactionId::next();
/// let b = TransactionId::next();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub u64);

impl TransactionId {
    #[inline]
    pub fn new(id: u64) -> Self {
        TransactionId(id)
    }

    /// Allocate a fresh, process-wide unique id.
    pub fn next() -> Self {
        TransactionId(NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txn({})", self.0)
    }
}
