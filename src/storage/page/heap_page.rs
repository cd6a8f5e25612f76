//! Heap page - the decoded, in-memory form of one page of a heap file.

use std::sync::Arc;

use crate::common::{Error, PageId, RecordId, Result};
use crate::storage::tuple::{Tuple, TupleDesc};

/// Slot numbers are `u16` in a [`RecordId`].
const MAX_SLOTS: usize = u16::MAX as usize + 1;

/// A page of fixed-width tuple slots.
///
/// # Layout
/// ```text
/// ┌──────────────────┬─────────┬─────────┬─────┬──────────────┬─────────┐
/// │ occupancy bitmap │ slot 0  │ slot 1  │ ... │ slot n-1     │ padding │
/// │ ceil(n/8) bytes  │ tuple   │ tuple   │     │ tuple        │ zeros   │
/// └──────────────────┴─────────┴─────────┴─────┴──────────────┴─────────┘
/// ```
/// `n = floor(page_size * 8 / (tuple_size * 8 + 1))`: each slot costs its
/// tuple bytes plus one header bit. Bit `i` lives in byte `i / 8`, least
/// significant bit first.
///
/// # Before-image
/// The page keeps a copy of the bytes it was loaded from. The buffer pool
/// hands that copy to the write-ahead log as the pre-image of a flush and
/// replaces it with the written bytes after every successful flush, so it
/// always matches what the heap file holds.
#[derive(Debug, Clone)]
pub struct HeapPage {
    id: PageId,
    desc: Arc<TupleDesc>,
    page_size: usize,
    header: Vec<u8>,
    slots: Vec<Option<Tuple>>,
    before_image: Vec<u8>,
}

impl HeapPage {
    /// Number of tuple slots a page of `page_size` bytes holds for `desc`.
    pub fn slot_count(desc: &TupleDesc, page_size: usize) -> usize {
        (page_size * 8) / (desc.size() * 8 + 1)
    }

    fn header_len(num_slots: usize) -> usize {
        num_slots.div_ceil(8)
    }

    /// Bytes of a freshly appended, empty page.
    pub fn empty_page_data(page_size: usize) -> Vec<u8> {
        vec![0u8; page_size]
    }

    /// An empty page, as if just appended to the file.
    pub fn empty(id: PageId, desc: Arc<TupleDesc>, page_size: usize) -> Result<Self> {
        Self::from_bytes(id, desc, &Self::empty_page_data(page_size))
    }

    /// Decode a page; `data.len()` is the page size.
    ///
    /// # Errors
    /// `Error::CorruptPage` if a used slot does not decode under `desc`, if
    /// a single tuple cannot fit in a page of this size, or if the page has
    /// more slots than a [`RecordId`] can address.
    pub fn from_bytes(id: PageId, desc: Arc<TupleDesc>, data: &[u8]) -> Result<Self> {
        let page_size = data.len();
        let num_slots = Self::slot_count(&desc, page_size);
        if num_slots == 0 {
            return Err(Error::CorruptPage(
                id,
                format!("{}-byte tuples do not fit in {}-byte pages", desc.size(), page_size),
            ));
        }
        if num_slots > MAX_SLOTS {
            return Err(Error::CorruptPage(
                id,
                format!("{} slots exceed the {} addressable per page", num_slots, MAX_SLOTS),
            ));
        }

        let header_len = Self::header_len(num_slots);
        let header = data[..header_len].to_vec();
        let tuple_size = desc.size();

        let mut slots = Vec::with_capacity(num_slots);
        for slot in 0..num_slots {
            if header[slot / 8] & (1 << (slot % 8)) == 0 {
                slots.push(None);
                continue;
            }
            let start = header_len + slot * tuple_size;
            let mut tuple = Tuple::decode(&desc, &data[start..start + tuple_size])
                .map_err(|reason| Error::CorruptPage(id, format!("slot {}: {}", slot, reason)))?;
            tuple.set_record_id(Some(RecordId::new(id, slot as u16)));
            slots.push(Some(tuple));
        }

        Ok(Self {
            id,
            desc,
            page_size,
            header,
            slots,
            before_image: data.to_vec(),
        })
    }

    /// Encode the page back into `page_size` bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = vec![0u8; self.page_size];
        let header_len = self.header.len();
        data[..header_len].copy_from_slice(&self.header);

        let tuple_size = self.desc.size();
        for (slot, tuple) in self.slots.iter().enumerate() {
            if let Some(tuple) = tuple {
                let start = header_len + slot * tuple_size;
                tuple.encode_into(&self.desc, &mut data[start..start + tuple_size]);
            }
        }
        data
    }

    #[inline]
    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    #[inline]
    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn num_empty_slots(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_none()).count()
    }

    pub fn is_slot_used(&self, slot: usize) -> bool {
        slot < self.slots.len() && self.header[slot / 8] & (1 << (slot % 8)) != 0
    }

    fn mark_slot(&mut self, slot: usize, used: bool) {
        if used {
            self.header[slot / 8] |= 1 << (slot % 8);
        } else {
            self.header[slot / 8] &= !(1 << (slot % 8));
        }
    }

    /// Store `tuple` in the first free slot and return where it went.
    ///
    /// # Errors
    /// - `Error::SchemaMismatch` if the tuple does not fit the page's schema
    /// - `Error::PageFull` if no slot is free
    pub fn insert_tuple(&mut self, mut tuple: Tuple) -> Result<RecordId> {
        self.desc.validate(&tuple)?;
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(Error::PageFull(self.id))?;

        let record_id = RecordId::new(self.id, slot as u16);
        tuple.set_record_id(Some(record_id));
        self.slots[slot] = Some(tuple);
        self.mark_slot(slot, true);
        Ok(record_id)
    }

    /// Free the slot `tuple` was stored in.
    ///
    /// # Errors
    /// `Error::TupleNotFound` if the tuple has no record id, points at another
    /// page, or its slot is already free.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let record_id = tuple.record_id().ok_or(Error::TupleNotFound)?;
        let slot = record_id.slot as usize;
        if record_id.page_id != self.id || !self.is_slot_used(slot) {
            return Err(Error::TupleNotFound);
        }

        self.slots[slot] = None;
        self.mark_slot(slot, false);
        Ok(())
    }

    /// Live tuples in slot order.
    pub fn tuples(&self) -> impl Iterator<Item = &Tuple> {
        self.slots.iter().flatten()
    }

    /// Bytes of the page as of its last load or flush.
    pub fn before_image(&self) -> &[u8] {
        &self.before_image
    }

    /// Record `written` as the page's durable contents.
    pub fn set_before_image(&mut self, written: Vec<u8>) {
        self.before_image = written;
    }
}
