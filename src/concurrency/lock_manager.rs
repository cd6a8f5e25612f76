//! Lock Manager - page-level shared/exclusive locks under strict 2PL.
//!
//! The [`LockManager`] provides:
//! - Shared/exclusive page locks held until transaction completion
//! - Eager deadlock detection on every failed acquisition
//! - Blocking acquisition with wake-on-release (no polling)

use std::collections::{HashMap, HashSet};
use std::fmt;

use log::{trace, warn};
use parking_lot::{Condvar, Mutex};

use crate::common::{Error, PageId, Result, TransactionId};
use crate::concurrency::WaitForGraph;

/// Access mode requested for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockMode {
    /// Read access; any number of transactions may share it.
    Shared,
    /// Read-write access; held by at most one transaction.
    Exclusive,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Shared => write!(f, "S"),
            LockMode::Exclusive => write!(f, "X"),
        }
    }
}

/// Everything guarded by the lock manager's mutex.
#[derive(Debug, Default)]
struct LockTable {
    /// Holders of each page and the mode each holds.
    locks: HashMap<PageId, HashMap<TransactionId, LockMode>>,
    /// Reverse index: pages each transaction holds a lock on.
    held: HashMap<TransactionId, HashSet<PageId>>,
    waits_for: WaitForGraph,
}

impl LockTable {
    /// Other transactions whose locks on `page_id` conflict with `mode`.
    fn conflicts(
        &self,
        tid: TransactionId,
        page_id: PageId,
        mode: LockMode,
    ) -> Vec<TransactionId> {
        let Some(holders) = self.locks.get(&page_id) else {
            return Vec::new();
        };
        holders
            .iter()
            .filter(|&(&holder, &held)| {
                holder != tid && (mode == LockMode::Exclusive || held == LockMode::Exclusive)
            })
            .map(|(&holder, _)| holder)
            .collect()
    }

    fn grant(&mut self, tid: TransactionId, page_id: PageId, mode: LockMode) {
        let entry = self.locks.entry(page_id).or_default().entry(tid).or_insert(mode);
        // Never downgrade an exclusive lock
        *entry = (*entry).max(mode);
        self.held.entry(tid).or_default().insert(page_id);
        self.waits_for.clear_waits(tid);
    }

    fn remove(&mut self, tid: TransactionId, page_id: PageId) -> bool {
        let Some(holders) = self.locks.get_mut(&page_id) else {
            return false;
        };
        let removed = holders.remove(&tid).is_some();
        if holders.is_empty() {
            self.locks.remove(&page_id);
        }
        if let Some(pages) = self.held.get_mut(&tid) {
            pages.remove(&page_id);
            if pages.is_empty() {
                self.held.remove(&tid);
            }
        }
        removed
    }
}

/// Grants page locks to transactions and detects deadlocks.
///
/// # Architecture
/// ```text
/// ┌───────────────────────────────────────────────────────────┐
/// │                       LockManager                         │
/// │  ┌──────────────────── Mutex<LockTable> ───────────────┐  │
/// │  │ locks:     PageId → { TransactionId → LockMode }    │  │
/// │  │ held:      TransactionId → { PageId }               │  │
/// │  │ waits_for: TransactionId → { TransactionId }        │  │
/// │  └─────────────────────────────────────────────────────┘  │
/// │  ┌─────────────┐                                          │
/// │  │   Condvar   │  woken on every grant and release        │
/// │  └─────────────┘                                          │
/// └───────────────────────────────────────────────────────────┘
/// ```
///
/// # Compatibility
/// | held \ requested | Shared | Exclusive |
/// |------------------|--------|-----------|
/// | none             | grant  | grant     |
/// | Shared (others)  | grant  | wait      |
/// | Exclusive (other)| wait   | wait      |
///
/// A transaction's own lock never conflicts with its request: holding
/// Shared and asking for Exclusive upgrades as soon as no one else holds
/// the page, and holding Exclusive satisfies a Shared request.
///
/// # Deadlock Detection
/// Every failed attempt rewrites the requester's wait-for edges to the
/// current conflicting holders and searches for a cycle back to the
/// requester. A cycle fails the request with [`Error::Deadlock`]; the
/// requester is the one that aborts.
#[derive(Debug, Default)]
pub struct LockManager {
    table: Mutex<LockTable>,
    released: Condvar,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Acquisition
    // ========================================================================

    /// Try once to lock `page_id` in `mode` for `tid`.
    ///
    /// Returns `Ok(true)` when granted and `Ok(false)` when another
    /// transaction holds a conflicting lock.
    ///
    /// # Errors
    /// `Error::Deadlock` if waiting would close a cycle in the wait-for graph.
    pub fn try_acquire(
        &self,
        tid: TransactionId,
        page_id: PageId,
        mode: LockMode,
    ) -> Result<bool> {
        let mut table = self.table.lock();
        self.attempt(&mut table, tid, page_id, mode)
    }

    /// Lock `page_id` in `mode` for `tid`, blocking until granted.
    ///
    /// Re-runs deadlock detection each time the waiter wakes, so a cycle
    /// formed after the first attempt is still caught.
    ///
    /// # Errors
    /// `Error::Deadlock` if the request closes a wait-for cycle.
    pub fn acquire(&self, tid: TransactionId, page_id: PageId, mode: LockMode) -> Result<()> {
        let mut table = self.table.lock();
        while !self.attempt(&mut table, tid, page_id, mode)? {
            trace!("{} waiting for {} on {}", tid, mode, page_id);
            self.released.wait(&mut table);
        }
        Ok(())
    }

    fn attempt(
        &self,
        table: &mut LockTable,
        tid: TransactionId,
        page_id: PageId,
        mode: LockMode,
    ) -> Result<bool> {
        let conflicts = table.conflicts(tid, page_id, mode);
        if conflicts.is_empty() {
            table.grant(tid, page_id, mode);
            trace!("granted {} on {} to {}", mode, page_id, tid);
            // Waiters blocked on us re-check their edges
            self.released.notify_all();
            return Ok(true);
        }

        table.waits_for.set_waits(tid, conflicts);
        if table.waits_for.has_cycle_from(tid) {
            table.waits_for.clear_waits(tid);
            warn!("deadlock: {} requesting {} on {}", tid, mode, page_id);
            return Err(Error::Deadlock { tid, page_id });
        }
        Ok(false)
    }

    // ========================================================================
    // Release
    // ========================================================================

    /// Release `tid`'s lock on a single page.
    ///
    /// Breaks two-phase locking; only for callers that know the page was
    /// not read or written in a way later operations depend on.
    pub fn release(&self, tid: TransactionId, page_id: PageId) {
        let mut table = self.table.lock();
        if table.remove(tid, page_id) {
            trace!("released {} on {}", tid, page_id);
            self.released.notify_all();
        }
    }

    /// Release every lock `tid` holds and forget its wait-for edges.
    pub fn complete_transaction(&self, tid: TransactionId) {
        let mut table = self.table.lock();
        let pages = table.held.remove(&tid).unwrap_or_default();
        for page_id in &pages {
            if let Some(holders) = table.locks.get_mut(page_id) {
                holders.remove(&tid);
                if holders.is_empty() {
                    table.locks.remove(page_id);
                }
            }
        }
        table.waits_for.remove_transaction(tid);
        trace!("{} released {} locks", tid, pages.len());
        self.released.notify_all();
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn holds_lock(&self, tid: TransactionId, page_id: PageId) -> bool {
        self.lock_mode(tid, page_id).is_some()
    }

    /// Mode `tid` holds on `page_id`, if any.
    pub fn lock_mode(&self, tid: TransactionId, page_id: PageId) -> Option<LockMode> {
        let table = self.table.lock();
        table.locks.get(&page_id)?.get(&tid).copied()
    }

    /// Current holders of `page_id`, ordered by transaction id.
    pub fn holders(&self, page_id: PageId) -> Vec<(TransactionId, LockMode)> {
        let table = self.table.lock();
        let mut holders: Vec<(TransactionId, LockMode)> = table
            .locks
            .get(&page_id)
            .map(|h| h.iter().map(|(&tid, &mode)| (tid, mode)).collect())
            .unwrap_or_default();
        holders.sort();
        holders
    }

    /// Pages `tid` holds a lock on.
    pub fn pages_held(&self, tid: TransactionId) -> Vec<PageId> {
        let table = self.table.lock();
        let mut pages: Vec<PageId> = table
            .held
            .get(&tid)
            .map(|p| p.iter().copied().collect())
            .unwrap_or_default();
        pages.sort();
        pages
    }

    /// Transactions `tid` is blocked on right now.
    pub fn waiting_on(&self, tid: TransactionId) -> Vec<TransactionId> {
        self.table.lock().waits_for.waiting_on(tid)
    }

    /// Whether `tid` has any lock or wait-for edge left.
    pub fn is_tracked(&self, tid: TransactionId) -> bool {
        let table = self.table.lock();
        table.held.contains_key(&tid) || table.waits_for.contains(tid)
    }
}
