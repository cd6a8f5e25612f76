//! heapstore - the storage core of a teaching relational database.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           heapstore                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │         Database + Transaction (concurrency/)            │   │
//! │  │       begin → get_page / insert / delete → commit        │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                Buffer Pool (buffer/)                     │   │
//! │  │   ┌───────────────────┐   ┌─────────────────────────┐   │   │
//! │  │   │    LockManager    │   │  Eviction: LRU | FIFO   │   │   │
//! │  │   │ S/X + wait-for    │   │  (chosen at startup)    │   │   │
//! │  │   └───────────────────┘   └─────────────────────────┘   │   │
//! │  │      BufferPool + Frame + PageRef + Statistics          │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                 ↓                            ↓                  │
//! │  ┌───────────────────────────┐   ┌──────────────────────────┐  │
//! │  │  Storage (storage/)       │   │  Log (recovery/)         │  │
//! │  │  Catalog → HeapFile       │   │  WriteAheadLog + LogFile │  │
//! │  │  HeapPage + Tuple         │   │  forced before writes    │  │
//! │  └───────────────────────────┘   └──────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, TransactionId, Error, config)
//! - [`buffer`] - Buffer pool and eviction policies
//! - [`concurrency`] - Page locks, deadlock detection, transactions
//! - [`storage`] - Heap files, page layout, tuples
//! - [`catalog`] - Table registry
//! - [`recovery`] - Write-ahead log
//!
//! # Quick Start
//! ```no_run
//! use std::sync::Arc;
//! use heapstore::recovery::LogFile;
//! use heapstore::{Database, DatabaseConfig, Field, FieldType, Tuple, TupleDesc};
//!
//! let log = Arc::new(LogFile::create("my_database.log").unwrap());
//! let db = Database::new(DatabaseConfig::default(), log);
//! let table = db
//!     .catalog()
//!     .create_table("users", "users.dat", TupleDesc::from_types(&[FieldType::Int]))
//!     .unwrap();
//!
//! let txn = db.begin();
//! txn.insert_tuple(table, Tuple::new(vec![Field::Int(1)])).unwrap();
//! txn.commit().unwrap();
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod concurrency;
mod database;
pub mod recovery;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{DatabaseConfig, DEFAULT_PAGE_SIZE};
pub use common::{Error, PageId, RecordId, Result, TableId, TransactionId};

pub use buffer::replacer::EvictionPolicy;
pub use buffer::{BufferPool, BufferPoolStats, PageRef, StatsSnapshot};
pub use catalog::Catalog;
pub use concurrency::{LockManager, LockMode, Transaction};
pub use database::Database;
pub use recovery::{LogFile, WriteAheadLog};
pub use storage::{Field, FieldDef, FieldType, HeapFile, Tuple, TupleDesc};
