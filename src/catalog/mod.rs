//! Catalog - maps table ids and names to their heap files.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::common::{Error, Result, TableId};
use crate::storage::{HeapFile, TupleDesc};

#[derive(Debug)]
struct TableEntry {
    name: String,
    file: Arc<HeapFile>,
}

/// Registry of the tables the buffer pool can load pages from.
///
/// Tables are only ever added. Lookups take a read lock and hand out an
/// `Arc<HeapFile>`, so the catalog lock is never held across I/O.
#[derive(Debug)]
pub struct Catalog {
    page_size: usize,
    tables: RwLock<HashMap<TableId, TableEntry>>,
}

impl Catalog {
    /// Create an empty catalog whose tables all use `page_size`-byte pages.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            tables: RwLock::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Open (or create) the heap file at `path` and register it as `name`.
    ///
    /// Ids are assigned sequentially from 0.
    pub fn create_table<P: AsRef<Path>>(
        &self,
        name: &str,
        path: P,
        desc: TupleDesc,
    ) -> Result<TableId> {
        let mut tables = self.tables.write();
        let table_id = tables.len() as TableId;
        let file = HeapFile::open(path, table_id, Arc::new(desc), self.page_size)?;
        debug!("registered table {} as {} ({})", name, table_id, file.path().display());

        tables.insert(
            table_id,
            TableEntry {
                name: name.to_string(),
                file: Arc::new(file),
            },
        );
        Ok(table_id)
    }

    /// Heap file of table `table_id`.
    ///
    /// # Errors
    /// `Error::UnknownTable` if no such table was registered.
    pub fn table(&self, table_id: TableId) -> Result<Arc<HeapFile>> {
        self.tables
            .read()
            .get(&table_id)
            .map(|entry| Arc::clone(&entry.file))
            .ok_or(Error::UnknownTable(table_id))
    }

    /// Id of the most recently registered table called `name`.
    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.tables
            .read()
            .iter()
            .filter(|(_, entry)| entry.name == name)
            .map(|(&id, _)| id)
            .max()
    }

    pub fn table_name(&self, table_id: TableId) -> Option<String> {
        self.tables.read().get(&table_id).map(|entry| entry.name.clone())
    }

    pub fn tuple_desc(&self, table_id: TableId) -> Result<Arc<TupleDesc>> {
        Ok(Arc::clone(self.table(table_id)?.tuple_desc()))
    }

    /// All registered table ids, ascending.
    pub fn table_ids(&self) -> Vec<TableId> {
        let mut ids: Vec<TableId> = self.tables.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
