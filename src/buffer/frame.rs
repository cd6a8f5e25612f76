//! Frame - one cached page in the buffer pool.
//!
//! A [`Frame`] holds a decoded [`HeapPage`] plus metadata needed for buffer
//! management:
//! - Which page it caches (fixed for the frame's lifetime)
//! - Pin count for reference counting
//! - Which transaction dirtied it, if any

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::{PageId, TransactionId};
use crate::storage::page::HeapPage;

/// A cached page.
///
/// Frames are allocated on a cache miss and dropped once the cache and
/// every [`PageRef`](crate::buffer::PageRef) let go of them. A discarded
/// frame that a caller still holds is simply no longer the cached copy.
///
/// # Thread Safety
/// All fields use interior mutability for safe concurrent access:
/// - `page`: `RwLock` latch over the page contents
/// - `pin_count`: `AtomicU32` for lock-free reference counting
/// - `dirty_owner`: `Mutex` so owner and flag change together
#[derive(Debug)]
pub struct Frame {
    page_id: PageId,

    /// The decoded page, protected by RwLock.
    page: RwLock<HeapPage>,

    /// Number of live `PageRef`s to this frame.
    pin_count: AtomicU32,

    /// Transaction that last modified the page since it was loaded or flushed.
    dirty_owner: Mutex<Option<TransactionId>>,
}

impl Frame {
    /// Wrap a freshly loaded, clean page.
    pub fn new(page: HeapPage) -> Self {
        Self {
            page_id: page.id(),
            page: RwLock::new(page),
            pin_count: AtomicU32::new(0),
            dirty_owner: Mutex::new(None),
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    // ========================================================================
    // Page access (RwLock)
    // ========================================================================

    /// Acquire read latch on the page.
    #[inline]
    pub fn page(&self) -> RwLockReadGuard<'_, HeapPage> {
        self.page.read()
    }

    /// Acquire write latch on the page.
    #[inline]
    pub fn page_mut(&self) -> RwLockWriteGuard<'_, HeapPage> {
        self.page.write()
    }

    // ========================================================================
    // Pin count operations (Atomic)
    // ========================================================================

    /// Increment the pin count. Returns the new pin count.
    #[inline]
    pub fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Decrement the pin count. Returns the new pin count.
    ///
    /// # Panics
    /// Panics if pin count is already 0.
    #[inline]
    pub fn unpin(&self) -> u32 {
        let old = self.pin_count.fetch_sub(1, Ordering::Relaxed);
        assert!(old > 0, "pin count underflow");
        old - 1
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    // ========================================================================
    // Dirty tracking
    // ========================================================================

    /// Record that `tid` modified the page.
    pub fn mark_dirty(&self, tid: TransactionId) {
        *self.dirty_owner.lock() = Some(tid);
    }

    pub fn clear_dirty(&self) {
        *self.dirty_owner.lock() = None;
    }

    pub fn dirty_owner(&self) -> Option<TransactionId> {
        *self.dirty_owner.lock()
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty_owner().is_some()
    }
}
