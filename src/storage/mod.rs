//! Storage layer - table files, page formats and tuples.
//!
//! This module handles persistent storage:
//! - [`HeapFile`] - Page-granular file I/O for one table
//! - [`page`] - Page layouts
//! - [`Tuple`] / [`TupleDesc`] - Rows and schemas

mod heap_file;
pub mod page;
mod tuple;

pub use heap_file::{HeapFile, HeapScan};
pub use tuple::{Field, FieldDef, FieldType, Tuple, TupleDesc};
