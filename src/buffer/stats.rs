//! Counters for cache behaviour, I/O and lock conflicts.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the [`BufferPool`](crate::BufferPool) as it works.
///
/// Each counter is an independent `AtomicU64` bumped with
/// `Ordering::Relaxed`: no counter is used to publish other memory, so
/// readers may see counters from slightly different moments. Use
/// [`snapshot`](Self::snapshot) for a copy to print or compare.
///
/// | Counter           | Bumped when                                 |
/// |-------------------|---------------------------------------------|
/// | `cache_hits`      | `get_page` finds the page resident          |
/// | `cache_misses`    | `get_page` has to read the heap file        |
/// | `evictions`       | a clean or flushed page leaves the cache    |
/// | `pages_read`      | a page image is decoded from its heap file  |
/// | `pages_written`   | a page image reaches its heap file          |
/// | `pages_discarded` | an aborted change is dropped unwritten      |
/// | `deadlocks`       | a lock request is refused to break a cycle  |
///
/// # Example
/// ```
/// use heapstore::BufferPoolStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = BufferPoolStats::new();
/// stats.deadlocks.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.snapshot().deadlocks, 1);
/// ```
#[derive(Debug)]
pub struct BufferPoolStats {
    /// Number of times a page was found in the buffer pool.
    pub cache_hits: AtomicU64,

    /// Number of times a page had to be read from disk.
    pub cache_misses: AtomicU64,

    /// Number of times a page was evicted from the buffer pool.
    pub evictions: AtomicU64,

    /// Number of pages read from disk.
    pub pages_read: AtomicU64,

    /// Number of pages written to disk.
    pub pages_written: AtomicU64,

    /// Number of pages dropped from the cache without write-back.
    pub pages_discarded: AtomicU64,

    /// Number of lock requests refused because they closed a wait-for cycle.
    pub deadlocks: AtomicU64,
}

impl BufferPoolStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self {
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            pages_read: AtomicU64::new(0),
            pages_written: AtomicU64::new(0),
            pages_discarded: AtomicU64::new(0),
            deadlocks: AtomicU64::new(0),
        }
    }

    /// Calculate cache hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let total = hits + misses;

        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Copy every counter out.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            pages_read: self.pages_read.load(Ordering::Relaxed),
            pages_written: self.pages_written.load(Ordering::Relaxed),
            pages_discarded: self.pages_discarded.load(Ordering::Relaxed),
            deadlocks: self.deadlocks.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.pages_read.store(0, Ordering::Relaxed);
        self.pages_written.store(0, Ordering::Relaxed);
        self.pages_discarded.store(0, Ordering::Relaxed);
        self.deadlocks.store(0, Ordering::Relaxed);
    }
}

impl Default for BufferPoolStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain copy of [`BufferPoolStats`] taken at one moment.
///
/// # Example
/// ```
/// use heapstore::BufferPoolStats;
///
/// let stats = BufferPoolStats::new();
/// let snapshot = stats.snapshot();
/// assert!(snapshot.to_string().starts_with("Stats {"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub evictions: u64,
    pub pages_read: u64,
    pub pages_written: u64,
    pub pages_discarded: u64,
    pub deadlocks: u64,
}

impl StatsSnapshot {
    /// Calculate cache hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ hits: {}, misses: {}, evictions: {}, written: {}, deadlocks: {}, hit_rate: {:.2}% }}",
            self.cache_hits,
            self.cache_misses,
            self.evictions,
            self.pages_written,
            self.deadlocks,
            self.hit_rate() * 100.0
        )
    }
}
