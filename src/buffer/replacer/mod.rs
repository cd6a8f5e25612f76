//! Eviction policy implementations (replacers).
//!
//! Implements:
//! - [`LruReplacer`] - Least Recently Used (default)
//! - [`FifoReplacer`] - First-In-First-Out, re-access does not reorder
//!
//! Both track resident page ids only; the buffer pool calls
//! [`EvictionStrategy::remove`] whenever a page leaves the cache and
//! [`EvictionStrategy::set_evictable`] whenever its pin count changes
//! between zero and non-zero, so a victim is always resident and unpinned.

mod fifo;
mod lru;

pub use fifo::FifoReplacer;
pub use lru::LruReplacer;

use crate::common::PageId;

/// Replacement policy consulted by the buffer pool under capacity pressure.
///
/// Newly recorded pages start out evictable. Implementations are driven
/// under the buffer pool's cache mutex and need no internal locking.
pub trait EvictionStrategy: Send {
    /// Note that `page_id` was accessed (hit or miss).
    fn record_access(&mut self, page_id: PageId);

    /// Mark a tracked page as (non-)evictable. Untracked ids are ignored.
    fn set_evictable(&mut self, page_id: PageId, evictable: bool);

    /// Pick a victim among evictable pages and stop tracking it.
    ///
    /// Returns `None` when nothing is tracked or every page is pinned.
    fn select_victim(&mut self) -> Option<PageId>;

    /// Stop tracking a page that left the cache for another reason.
    fn remove(&mut self, page_id: PageId);

    /// Number of tracked pages.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Selects the [`EvictionStrategy`] variant at buffer pool construction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    #[default]
    Lru,
    Fifo,
}

impl EvictionPolicy {
    /// Build an empty strategy of this kind.
    pub fn build(self) -> Box<dyn EvictionStrategy> {
        match self {
            EvictionPolicy::Lru => Box::new(LruReplacer::new()),
            EvictionPolicy::Fifo => Box::new(FifoReplacer::new()),
        }
    }
}
