//! Database - wires the catalog, buffer pool and log together.

use std::sync::Arc;

use log::info;

use crate::buffer::BufferPool;
use crate::catalog::Catalog;
use crate::common::config::DatabaseConfig;
use crate::concurrency::Transaction;
use crate::recovery::WriteAheadLog;

/// One database instance.
///
/// Owns the [`Catalog`] and the [`BufferPool`]; page size, pool capacity
/// and eviction policy come from the [`DatabaseConfig`] and never change
/// afterwards.
pub struct Database {
    config: DatabaseConfig,
    catalog: Arc<Catalog>,
    buffer_pool: BufferPool,
}

impl Database {
    /// Build a database that logs through `log`.
    ///
    /// # Panics
    /// Panics if `config.pool_pages` is 0.
    pub fn new(config: DatabaseConfig, log: Arc<dyn WriteAheadLog>) -> Self {
        let catalog = Arc::new(Catalog::new(config.page_size));
        let buffer_pool = BufferPool::new(
            config.pool_pages,
            config.eviction,
            Arc::clone(&catalog),
            log,
        );
        info!(
            "database ready: {} pages of {} bytes, {:?} eviction",
            config.pool_pages, config.page_size, config.eviction
        );

        Self {
            config,
            catalog,
            buffer_pool,
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffer_pool
    }

    /// Start a transaction.
    pub fn begin(&self) -> Transaction<'_> {
        Transaction::begin(&self.buffer_pool)
    }
}
