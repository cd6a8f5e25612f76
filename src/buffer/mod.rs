//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache layer between transactions and
//! heap files. It holds a bounded number of decoded pages, each guarded by
//! a page lock and a latch.
//!
//! # Components
//! - [`BufferPool`] - The page cache, lock gateway and flush/rollback logic
//! - [`Frame`] - A cached page plus pin count and dirty owner
//! - [`PageRef`] - RAII handle that keeps a page pinned
//! - [`BufferPoolStats`] - Performance statistics
//! - [`replacer`] - Eviction policy implementations

mod buffer_pool;
mod frame;
mod page_ref;
pub mod replacer;
mod stats;

pub use buffer_pool::BufferPool;
pub use frame::Frame;
pub use page_ref::PageRef;
pub use stats::{BufferPoolStats, StatsSnapshot};
