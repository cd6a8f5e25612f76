//! Page and record identifiers.

use std::fmt;

/// Identifies a table (and its heap file) in the catalog.
pub type TableId = u32;

/// Identifies a fixed-size page within a table's file.
///
/// Equality and hashing are by value, so a `PageId` can be rebuilt from
/// its parts anywhere and still find the cached page.
///
/// # Example
/// ```
/// use heapstore::PageId;
///
/// let page_id = PageId::new(1, 42);
/// assert_eq!(page_id.table_id, 1);
/// assert_eq!(page_id.page_no, 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    pub table_id: TableId,
    pub page_no: u32,
}

impl PageId {
    #[inline]
    pub fn new(table_id: TableId, page_no: u32) -> Self {
        Self { table_id, page_no }
    }

    /// Byte offset of this page in its file.
    #[inline]
    pub fn offset(&self, page_size: usize) -> u64 {
        (self.page_no as u64) * (page_size as u64)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page({}:{})", self.table_id, self.page_no)
    }
}

/// Location of a tuple: the page it lives on and its slot within that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: u16,
}

impl RecordId {
    #[inline]
    pub fn new(page_id: PageId, slot: u16) -> Self {
        Self { page_id, slot }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.page_id, self.slot)
    }
}
