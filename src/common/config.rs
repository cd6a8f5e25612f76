//! Configuration constants and construction-time settings for heapstore.

use crate::buffer::replacer::EvictionPolicy;

/// Default size of a page in bytes (4KB).
///
/// Matches the OS page size on most systems. Tests use smaller pages to
/// force multi-page files with only a handful of tuples.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default number of pages the buffer pool caches.
pub const DEFAULT_POOL_PAGES: usize = 50;

/// Fixed on-page width of a text field's payload, in bytes.
///
/// Every text field occupies a 4-byte length prefix followed by exactly
/// this many bytes, so tuples stay fixed-width.
pub const STRING_LEN: usize = 128;

/// Settings fixed when a [`Database`](crate::Database) is built.
///
/// # Example
/// ```
/// use heapstore::DatabaseConfig;
/// use heapstore::buffer::replacer::EvictionPolicy;
///
/// let config = DatabaseConfig::default()
///     .with_pool_pages(8)
///     .with_page_size(1024)
///     .with_eviction(EvictionPolicy::Fifo);
/// assert_eq!(config.pool_pages, 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Buffer pool capacity, in pages.
    pub pool_pages: usize,
    /// Size of every page in every heap file.
    pub page_size: usize,
    /// Replacement policy used when the pool is full.
    pub eviction: EvictionPolicy,
}

impl DatabaseConfig {
    pub fn with_pool_pages(mut self, pool_pages: usize) -> Self {
        self.pool_pages = pool_pages;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            pool_pages: DEFAULT_POOL_PAGES,
            page_size: DEFAULT_PAGE_SIZE,
            eviction: EvictionPolicy::Lru,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_page_size_is_power_of_two() {
        assert!(DEFAULT_PAGE_SIZE.is_power_of_two());
        assert_eq!(DEFAULT_PAGE_SIZE, 4096);
    }

    #[test]
    fn test_default_config() {
        let config = DatabaseConfig::default();
        assert_eq!(config.pool_pages, DEFAULT_POOL_PAGES);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.eviction, EvictionPolicy::Lru);
    }

    #[test]
    fn test_builder_overrides() {
        let config = DatabaseConfig::default()
            .with_pool_pages(1)
            .with_page_size(256)
            .with_eviction(EvictionPolicy::Fifo);
        assert_eq!(config.pool_pages, 1);
        assert_eq!(config.page_size, 256);
        assert_eq!(config.eviction, EvictionPolicy::Fifo);
    }
}
