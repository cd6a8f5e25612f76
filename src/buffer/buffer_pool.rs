//! Buffer Pool - the page cache every transaction reads and writes through.
//!
//! The [`BufferPool`] provides:
//! - Page-level locking through the [`LockManager`] on every access
//! - A bounded page cache with pluggable eviction
//! - Write-ahead logging before any page reaches its heap file
//! - Commit (flush) and abort (discard and reload) of a transaction's pages

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use log::{debug, error, trace, warn};
use parking_lot::Mutex;

use crate::buffer::replacer::{EvictionPolicy, EvictionStrategy};
use crate::buffer::{BufferPoolStats, Frame, PageRef};
use crate::catalog::Catalog;
use crate::common::{Error, PageId, RecordId, Result, TableId, TransactionId};
use crate::concurrency::{LockManager, LockMode};
use crate::recovery::WriteAheadLog;
use crate::storage::page::HeapPage;
use crate::storage::{HeapScan, Tuple};

/// Resident pages and the policy that orders them.
///
/// Kept under one mutex so the strategy only ever tracks resident pages.
struct PageCache {
    pages: HashMap<PageId, Arc<Frame>>,
    strategy: Box<dyn EvictionStrategy>,
}

impl PageCache {
    /// Whether `frame` is the cached copy of `page_id` (not a discarded one).
    fn holds(&self, page_id: PageId, frame: &Arc<Frame>) -> bool {
        self.pages
            .get(&page_id)
            .is_some_and(|cached| Arc::ptr_eq(cached, frame))
    }
}

/// Caches up to `capacity` pages and mediates all access to them.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────────────┐
/// │                         BufferPool                           │
/// │  ┌──────────────┐   ┌──────────────────────────────────────┐ │
/// │  │ LockManager  │   │        Mutex<PageCache>              │ │
/// │  │ S/X per page │   │  pages: PageId → Arc<Frame>          │ │
/// │  │ wait-for     │   │  strategy: Box<dyn EvictionStrategy> │ │
/// │  └──────────────┘   └──────────────────────────────────────┘ │
/// │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐      │
/// │  │   Catalog    │   │ WriteAheadLog│   │    stats     │      │
/// │  │ → HeapFile   │   │ log + force  │   │   atomics    │      │
/// │  └──────────────┘   └──────────────┘   └──────────────┘      │
/// └──────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - Page locks are acquired before the cache mutex is taken, so a
///   transaction blocked on a lock never stalls other cache operations.
/// - Insert, evict, flush and discard all run under the cache mutex.
/// - Page bytes are latched per frame; a [`PageRef`] pins its frame so it
///   is never chosen for eviction.
///
/// Commit, eviction and every flush call latch pages while holding the
/// cache mutex. A caller must not hold a [`PageRef`] latch guard across
/// any of them.
///
/// # Durability
/// Every page write is preceded by a log record of the page's before and
/// after images and a log force. Dirty pages of running transactions may
/// be written early to make room ("steal"); the pool keeps the pre-steal
/// image and restores it if that transaction aborts.
pub struct BufferPool {
    capacity: usize,

    cache: Mutex<PageCache>,

    /// Pre-images of pages written to disk before their writer finished.
    undo: Mutex<HashMap<TransactionId, HashMap<PageId, Vec<u8>>>>,

    catalog: Arc<Catalog>,

    lock_manager: LockManager,

    log: Arc<dyn WriteAheadLog>,

    stats: BufferPoolStats,
}

impl BufferPool {
    /// Create a buffer pool.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of resident pages
    /// * `policy` - Replacement policy used when the pool is full
    /// * `catalog` - Resolves table ids to heap files
    /// * `log` - Write-ahead log forced before every page write
    ///
    /// # Panics
    /// Panics if `capacity` is 0.
    pub fn new(
        capacity: usize,
        policy: EvictionPolicy,
        catalog: Arc<Catalog>,
        log: Arc<dyn WriteAheadLog>,
    ) -> Self {
        assert!(capacity > 0, "capacity must be > 0");

        Self {
            capacity,
            cache: Mutex::new(PageCache {
                pages: HashMap::with_capacity(capacity),
                strategy: policy.build(),
            }),
            undo: Mutex::new(HashMap::new()),
            catalog,
            lock_manager: LockManager::new(),
            log,
            stats: BufferPoolStats::new(),
        }
    }

    // ========================================================================
    // Public API: Page access
    // ========================================================================

    /// Fetch a page on behalf of `tid`, locking it in `mode` first.
    ///
    /// Blocks while another transaction holds a conflicting lock. On a miss
    /// the page is read from its heap file, evicting another page first if
    /// the pool is full.
    ///
    /// # Errors
    /// - `Error::Deadlock` if waiting for the lock would deadlock; `tid` must abort
    /// - `Error::UnknownTable` / `Error::InvalidPageReference` for a bad page id
    /// - `Error::NoEvictablePage` if the pool is full of pinned pages
    /// - `Error::Io` if the read (or a flush during eviction) fails
    pub fn get_page(
        &self,
        tid: TransactionId,
        page_id: PageId,
        mode: LockMode,
    ) -> Result<PageRef<'_>> {
        if let Err(e) = self.lock_manager.acquire(tid, page_id, mode) {
            if e.is_transaction_aborted() {
                self.stats.deadlocks.fetch_add(1, Ordering::Relaxed);
            }
            return Err(e);
        }

        let mut cache = self.cache.lock();
        let frame = match cache.pages.get(&page_id) {
            Some(frame) => {
                self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                trace!("cache hit {}", page_id);
                Arc::clone(frame)
            }
            None => {
                self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);
                // Read before evicting so a failed read leaves the cache alone
                let page = self.load_page(page_id)?;
                if cache.pages.len() >= self.capacity {
                    self.evict_page(&mut cache)?;
                }
                let frame = Arc::new(Frame::new(page));
                cache.pages.insert(page_id, Arc::clone(&frame));
                debug!("cache miss {}: loaded", page_id);
                frame
            }
        };

        frame.pin();
        cache.strategy.record_access(page_id);
        cache.strategy.set_evictable(page_id, false);
        drop(cache);

        Ok(PageRef::new(self, frame, tid, mode))
    }

    /// Insert `tuple` into table `table_id` on behalf of `tid`.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: TableId,
        tuple: Tuple,
    ) -> Result<RecordId> {
        let file = self.catalog.table(table_id)?;
        let (record_id, dirtied) = file.insert_tuple(self, tid, tuple)?;
        self.mark_dirty(tid, &dirtied)?;
        Ok(record_id)
    }

    /// Delete `tuple` from the table its record id points into.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        let record_id = tuple.record_id().ok_or(Error::TupleNotFound)?;
        let file = self.catalog.table(record_id.page_id.table_id)?;
        let dirtied = file.delete_tuple(self, tid, tuple)?;
        self.mark_dirty(tid, &dirtied)
    }

    /// Scan every live tuple of `table_id` under shared locks.
    pub fn scan(&self, tid: TransactionId, table_id: TableId) -> Result<HeapScan<'_>> {
        Ok(self.catalog.table(table_id)?.scan(self, tid))
    }

    /// Record that `tid` modified each of `pages`.
    ///
    /// A page that was discarded from the cache while the caller held it
    /// replaces whatever copy is now cached, so the modified copy is the
    /// one later readers see.
    pub fn mark_dirty(&self, tid: TransactionId, pages: &[PageRef<'_>]) -> Result<()> {
        let mut cache = self.cache.lock();
        for page_ref in pages {
            let page_id = page_ref.page_id();
            let frame = page_ref.frame();
            frame.mark_dirty(tid);

            if !cache.holds(page_id, frame) {
                if cache.pages.remove(&page_id).is_some() {
                    cache.strategy.remove(page_id);
                }
                if cache.pages.len() >= self.capacity {
                    self.evict_page(&mut cache)?;
                }
                cache.pages.insert(page_id, Arc::clone(frame));
                cache.strategy.record_access(page_id);
                cache.strategy.set_evictable(page_id, !frame.is_pinned());
                debug!("{} replaced cached copy of {}", tid, page_id);
            }
        }
        Ok(())
    }

    // ========================================================================
    // Public API: Transactions and locks
    // ========================================================================

    /// Finish `tid`: flush its pages on commit, roll them back on abort,
    /// then release all its locks.
    ///
    /// # Errors
    /// If a flush fails during commit the error is returned and the locks
    /// are kept; the caller must then abort `tid`. An abort always releases
    /// the locks and reports the first page it could not restore.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> Result<()> {
        let result = if commit {
            self.flush_pages(tid)?;
            self.undo.lock().remove(&tid);
            Ok(())
        } else {
            self.rollback(tid)
        };

        self.lock_manager.complete_transaction(tid);
        result
    }

    /// Whether `tid` holds any lock on `page_id`.
    pub fn holds_lock(&self, tid: TransactionId, page_id: PageId) -> bool {
        self.lock_manager.holds_lock(tid, page_id)
    }

    /// Release `tid`'s lock on one page before the transaction ends.
    ///
    /// This breaks two-phase locking. Use only when nothing read from or
    /// written to the page under this lock affects the transaction's result.
    pub fn unsafe_release_page(&self, tid: TransactionId, page_id: PageId) {
        self.lock_manager.release(tid, page_id);
    }

    // ========================================================================
    // Public API: Flush and discard
    // ========================================================================

    /// Write a page back if it is cached and dirty; it stays cached.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let cache = self.cache.lock();
        if let Some(frame) = cache.pages.get(&page_id) {
            self.flush_frame(frame)?;
        }
        Ok(())
    }

    /// Write back every page `tid` dirtied. The pages stay cached.
    pub fn flush_pages(&self, tid: TransactionId) -> Result<()> {
        let cache = self.cache.lock();
        for frame in cache.pages.values() {
            if frame.dirty_owner() == Some(tid) {
                self.flush_frame(frame)?;
            }
        }
        Ok(())
    }

    /// Write back every dirty page and drop it from the cache.
    pub fn flush_all_pages(&self) -> Result<()> {
        let mut cache = self.cache.lock();
        let dirty: Vec<PageId> = cache
            .pages
            .iter()
            .filter(|(_, frame)| frame.is_dirty())
            .map(|(&page_id, _)| page_id)
            .collect();

        for page_id in dirty {
            if let Some(frame) = cache.pages.get(&page_id).cloned() {
                self.flush_frame(&frame)?;
                cache.pages.remove(&page_id);
                cache.strategy.remove(page_id);
            }
        }
        Ok(())
    }

    /// Drop a page from the cache without writing it back.
    pub fn discard_page(&self, page_id: PageId) {
        let mut cache = self.cache.lock();
        self.discard_locked(&mut cache, page_id);
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    /// Maximum number of resident pages.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of pages currently cached.
    pub fn resident_count(&self) -> usize {
        self.cache.lock().pages.len()
    }

    pub fn is_resident(&self, page_id: PageId) -> bool {
        self.cache.lock().pages.contains_key(&page_id)
    }

    /// Transaction that dirtied the cached copy of `page_id`, if any.
    pub fn dirty_owner(&self, page_id: PageId) -> Option<TransactionId> {
        self.cache.lock().pages.get(&page_id)?.dirty_owner()
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    // ========================================================================
    // Internal: Called by PageRef on drop
    // ========================================================================

    /// Unpin a frame; the last unpin makes a cached frame evictable again.
    pub(crate) fn unpin(&self, frame: &Arc<Frame>) {
        let mut cache = self.cache.lock();
        if frame.unpin() == 0 && cache.holds(frame.page_id(), frame) {
            cache.strategy.set_evictable(frame.page_id(), true);
        }
    }

    // ========================================================================
    // Internal: Eviction, flush and rollback
    // ========================================================================

    fn load_page(&self, page_id: PageId) -> Result<HeapPage> {
        let page = self.catalog.table(page_id.table_id)?.read_page(page_id)?;
        self.stats.pages_read.fetch_add(1, Ordering::Relaxed);
        Ok(page)
    }

    /// Remove one unpinned page, writing it back first if dirty.
    fn evict_page(&self, cache: &mut PageCache) -> Result<()> {
        let victim = cache.strategy.select_victim().ok_or_else(|| {
            debug!("no evictable page: all {} pinned", cache.pages.len());
            Error::NoEvictablePage
        })?;

        let Some(frame) = cache.pages.get(&victim).cloned() else {
            error!("eviction strategy chose non-resident {}", victim);
            return Err(Error::NoEvictablePage);
        };

        if let Err(e) = self.flush_frame(&frame) {
            // Still resident and still dirty; keep it tracked
            cache.strategy.record_access(victim);
            return Err(e);
        }

        cache.pages.remove(&victim);
        self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        debug!("evicted {}", victim);
        Ok(())
    }

    /// Log, force, then write a dirty frame to its heap file.
    ///
    /// The written bytes become the frame's before-image, so the next
    /// flush logs (and a later steal saves for undo) what is actually on
    /// disk. Returns whether anything was written. On failure the frame
    /// keeps its dirty owner and its before-image.
    fn flush_frame(&self, frame: &Frame) -> Result<bool> {
        let Some(tid) = frame.dirty_owner() else {
            return Ok(false);
        };
        let page_id = frame.page_id();

        let page = frame.page();
        let before = page.before_image().to_vec();
        let after = page.to_bytes();
        drop(page);

        self.log.log_write(tid, page_id, &before, &after)?;
        self.log.force()?;
        self.catalog.table(page_id.table_id)?.write_page(page_id, &after)?;

        frame.clear_dirty();
        frame.page_mut().set_before_image(after);
        self.undo
            .lock()
            .entry(tid)
            .or_default()
            .entry(page_id)
            .or_insert(before);
        self.stats.pages_written.fetch_add(1, Ordering::Relaxed);
        debug!("flushed {} for {}", page_id, tid);
        Ok(true)
    }

    fn discard_locked(&self, cache: &mut PageCache, page_id: PageId) -> bool {
        let Some(frame) = cache.pages.remove(&page_id) else {
            return false;
        };
        cache.strategy.remove(page_id);
        frame.clear_dirty();
        self.stats.pages_discarded.fetch_add(1, Ordering::Relaxed);
        trace!("discarded {}", page_id);
        true
    }

    /// Undo `tid`'s changes: put back the pre-images of pages it already
    /// wrote to disk, then discard its dirty pages and reload them.
    fn rollback(&self, tid: TransactionId) -> Result<()> {
        let mut cache = self.cache.lock();
        let mut first_error = None;

        let written = self.undo.lock().remove(&tid).unwrap_or_default();
        for (page_id, before) in written {
            self.discard_locked(&mut cache, page_id);
            if let Err(e) = self.restore_page(tid, page_id, &before) {
                warn!("rollback of {} could not restore {}: {}", tid, page_id, e);
                first_error.get_or_insert(e);
            }
        }

        let dirty: Vec<PageId> = cache
            .pages
            .iter()
            .filter(|(_, frame)| frame.dirty_owner() == Some(tid))
            .map(|(&page_id, _)| page_id)
            .collect();

        for page_id in dirty {
            self.discard_locked(&mut cache, page_id);
            match self.load_page(page_id) {
                Ok(page) if cache.pages.len() < self.capacity => {
                    cache.pages.insert(page_id, Arc::new(Frame::new(page)));
                    cache.strategy.record_access(page_id);
                }
                Ok(_) => {}
                Err(e) => warn!("rollback of {} could not reload {}: {}", tid, page_id, e),
            }
            debug!("rolled back {} for {}", page_id, tid);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Write a pre-image back over a page `tid` already flushed.
    fn restore_page(&self, tid: TransactionId, page_id: PageId, before: &[u8]) -> Result<()> {
        let file = self.catalog.table(page_id.table_id)?;
        let current = file.read_page(page_id)?.to_bytes();
        self.log.log_write(tid, page_id, &current, before)?;
        self.log.force()?;
        file.write_page(page_id, before)?;
        self.stats.pages_written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
