//! RAII handle for a page fetched from the buffer pool.
//!
//! A [`PageRef`] keeps its page pinned until dropped. It also remembers the
//! lock mode it was fetched with, so write access through a shared fetch is
//! refused.

use std::sync::Arc;

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::buffer::{BufferPool, Frame};
use crate::common::{Error, PageId, Result, TransactionId};
use crate::concurrency::LockMode;
use crate::storage::page::HeapPage;

/// A pinned page.
///
/// The page lock taken by [`BufferPool::get_page`] outlives this handle
/// (strict two-phase locking); only the pin is released on drop.
///
/// # Example
/// ```ignore
/// let page = pool.get_page(tid, page_id, LockMode::Exclusive)?;
/// page.write()?.insert_tuple(tuple)?;
/// pool.mark_dirty(tid, std::slice::from_ref(&page))?;
/// // page drops here, unpinned
/// ```
pub struct PageRef<'a> {
    /// Reference back to the pool for unpin on drop.
    pool: &'a BufferPool,
    frame: Arc<Frame>,
    tid: TransactionId,
    mode: LockMode,
}

impl<'a> PageRef<'a> {
    /// Wrap an already pinned frame.
    pub(crate) fn new(
        pool: &'a BufferPool,
        frame: Arc<Frame>,
        tid: TransactionId,
        mode: LockMode,
    ) -> Self {
        Self {
            pool,
            frame,
            tid,
            mode,
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.frame.page_id()
    }

    #[inline]
    pub fn tid(&self) -> TransactionId {
        self.tid
    }

    #[inline]
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    pub(crate) fn frame(&self) -> &Arc<Frame> {
        &self.frame
    }

    /// Latch the page for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, HeapPage> {
        self.frame.page()
    }

    /// Latch the page for modification.
    ///
    /// Changes are not tracked by the pool until the page is passed to
    /// [`BufferPool::mark_dirty`].
    ///
    /// # Errors
    /// `Error::LockModeViolation` if the page was fetched in shared mode.
    pub fn write(&self) -> Result<RwLockWriteGuard<'_, HeapPage>> {
        if self.mode != LockMode::Exclusive {
            return Err(Error::LockModeViolation(self.page_id()));
        }
        Ok(self.frame.page_mut())
    }
}

impl Drop for PageRef<'_> {
    fn drop(&mut self) {
        self.pool.unpin(&self.frame);
    }
}
