//! FIFO (First-In-First-Out) replacement policy.

use std::collections::{HashSet, VecDeque};

use crate::buffer::replacer::EvictionStrategy;
use crate::common::PageId;

/// Evicts pages in the order they first entered the pool.
///
/// Re-accessing a queued page does not move it: the first insert wins.
/// Pinned pages are skipped but keep their place in line.
#[derive(Debug, Default)]
pub struct FifoReplacer {
    /// Page ids in insertion order (front = oldest).
    queue: VecDeque<PageId>,

    /// Membership set so repeated accesses are O(1) no-ops.
    in_queue: HashSet<PageId>,

    /// Queued pages that are currently pinned.
    pinned: HashSet<PageId>,
}

impl FifoReplacer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EvictionStrategy for FifoReplacer {
    fn record_access(&mut self, page_id: PageId) {
        if self.in_queue.insert(page_id) {
            self.queue.push_back(page_id);
        }
    }

    fn set_evictable(&mut self, page_id: PageId, evictable: bool) {
        if !self.in_queue.contains(&page_id) {
            return;
        }
        if evictable {
            self.pinned.remove(&page_id);
        } else {
            self.pinned.insert(page_id);
        }
    }

    fn select_victim(&mut self) -> Option<PageId> {
        let pos = self
            .queue
            .iter()
            .position(|page_id| !self.pinned.contains(page_id))?;
        let victim = self.queue.remove(pos)?;
        self.in_queue.remove(&victim);
        Some(victim)
    }

    fn remove(&mut self, page_id: PageId) {
        if self.in_queue.remove(&page_id) {
            self.queue.retain(|queued| *queued != page_id);
            self.pinned.remove(&page_id);
        }
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: u32) -> PageId {
        PageId::new(1, n)
    }

    #[test]
    fn test_fifo_basic() {
        let mut replacer = FifoReplacer::new();

        replacer.record_access(pid(0));
        replacer.record_access(pid(1));
        replacer.record_access(pid(2));
        assert_eq!(replacer.len(), 3);

        assert_eq!(replacer.select_victim(), Some(pid(0)));
        assert_eq!(replacer.select_victim(), Some(pid(1)));
        assert_eq!(replacer.select_victim(), Some(pid(2)));
        assert_eq!(replacer.select_victim(), None);
        assert!(replacer.is_empty());
    }

    #[test]
    fn test_fifo_skips_pinned_without_losing_its_place() {
        let mut replacer = FifoReplacer::new();

        replacer.record_access(pid(0));
        replacer.record_access(pid(1));
        replacer.record_access(pid(2));
        replacer.set_evictable(pid(0), false);

        assert_eq!(replacer.select_victim(), Some(pid(1)));

        // Unpinned again, page 0 is still the oldest
        replacer.set_evictable(pid(0), true);
        assert_eq!(replacer.select_victim(), Some(pid(0)));
        assert_eq!(replacer.select_victim(), Some(pid(2)));
    }

    #[test]
    fn test_fifo_all_pinned() {
        let mut replacer = FifoReplacer::new();
        replacer.record_access(pid(0));
        replacer.set_evictable(pid(0), false);

        assert_eq!(replacer.select_victim(), None);
        assert_eq!(replacer.len(), 1);
    }

    #[test]
    fn test_fifo_remove() {
        let mut replacer = FifoReplacer::new();

        replacer.record_access(pid(0));
        replacer.record_access(pid(1));
        replacer.remove(pid(0));

        assert_eq!(replacer.select_victim(), Some(pid(1)));
        assert_eq!(replacer.select_victim(), None);
    }

    #[test]
    fn test_fifo_reinsert_after_remove_goes_to_back() {
        let mut replacer = FifoReplacer::new();

        replacer.record_access(pid(0));
        replacer.record_access(pid(1));
        replacer.remove(pid(0));
        replacer.record_access(pid(0));

        assert_eq!(replacer.select_victim(), Some(pid(1)));
        assert_eq!(replacer.select_victim(), Some(pid(0)));
    }

    #[test]
    fn test_fifo_reaccess_no_reorder() {
        let mut replacer = FifoReplacer::new();

        replacer.record_access(pid(0));
        replacer.record_access(pid(1));
        replacer.record_access(pid(0)); // Access again - should NOT reorder

        assert_eq!(replacer.select_victim(), Some(pid(0)));
        assert_eq!(replacer.select_victim(), Some(pid(1)));
    }
}
