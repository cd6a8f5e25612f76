//! Page formats.
//!
//! This module contains:
//! - [`HeapPage`] - Slotted page of fixed-width tuples with an occupancy bitmap

mod heap_page;

pub use heap_page::HeapPage;
