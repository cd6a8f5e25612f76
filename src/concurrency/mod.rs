//! Concurrency control - page locks, deadlock detection and transactions.
//!
//! # Components
//! - [`LockManager`] - Shared/exclusive page locks under strict two-phase locking
//! - [`WaitForGraph`] - Blocked-on relation used to detect deadlocks
//! - [`Transaction`] - RAII handle that commits or aborts through the buffer pool

mod lock_manager;
mod transaction;
mod wait_for_graph;

pub use lock_manager::{LockManager, LockMode};
pub use transaction::Transaction;
pub use wait_for_graph::WaitForGraph;
