//! LRU (Least Recently Used) replacement policy.

use hashlink::LinkedHashMap;

use crate::buffer::replacer::EvictionStrategy;
use crate::common::PageId;

/// Evicts the least recently accessed unpinned page.
///
/// Backed by a [`LinkedHashMap`]: a doubly linked list threaded through a
/// hash index, giving O(1) move-to-back on access and O(1) removal. The
/// front of the list is the least recently used page; the value records
/// whether the page is currently evictable.
#[derive(Debug, Default)]
pub struct LruReplacer {
    entries: LinkedHashMap<PageId, bool>,
}

impl LruReplacer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EvictionStrategy for LruReplacer {
    fn record_access(&mut self, page_id: PageId) {
        let evictable = self.entries.remove(&page_id).unwrap_or(true);
        self.entries.insert(page_id, evictable);
    }

    fn set_evictable(&mut self, page_id: PageId, evictable: bool) {
        // `get_mut` leaves the entry's position alone
        if let Some(flag) = self.entries.get_mut(&page_id) {
            *flag = evictable;
        }
    }

    fn select_victim(&mut self) -> Option<PageId> {
        let victim = self
            .entries
            .iter()
            .find(|(_, evictable)| **evictable)
            .map(|(&page_id, _)| page_id)?;
        self.entries.remove(&victim);
        Some(victim)
    }

    fn remove(&mut self, page_id: PageId) {
        self.entries.remove(&page_id);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
