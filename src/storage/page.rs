// ┌─────────────────────────────────────────────────────────────────────────┐
// │ Offset │ Length │ Description                                           │
// │────────┼────────┼───────────────────────────────────────────────────────│
// │   0    │   2    │ NUM_RECORDS (u16): highest record id ever handed out  │
// │   2    │   2    │ END_FREE    (u16): last free byte before the records  │
// │  4*i   │   2    │ SIZE of record i (u16), 0 once deleted                │
// │ 4*i+2  │   2    │ LOC  of record i (u16), 0 once deleted                │
// │────────┼────────┼───────────────────────────────────────────────────────│
// │ END_FREE+1 .. PAGE_SIZE │ record bytes, packed from the end of the page│
// └─────────────────────────────────────────────────────────────────────────┘

use crate::error::{DbError, DbResult};

pub const PAGE_SIZE: usize = 4096;

pub const NUM_RECORDS_OFFSET: usize = 0;
pub const END_FREE_OFFSET: usize = 2;
pub const SLOT_SIZE: usize = 4;

/// Largest record an empty block can hold: everything but the block header,
/// one slot and the reserved last byte.
pub const MAX_RECORD_SIZE: usize = PAGE_SIZE - 1 - 2 * SLOT_SIZE;

/// Slot number of a record inside one block. Ids start at 1 and are never
/// reused within a block, so a deleted record's id stays dead.
pub type RecordId = u16;

fn read_u16(page: &[u8; PAGE_SIZE], offset: usize) -> u16 {
    u16::from_le_bytes([page[offset], page[offset + 1]])
}

fn write_u16(page: &mut [u8; PAGE_SIZE], offset: usize, value: u16) {
    page[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

/// A view over one raw block that stores variable-length records.
pub struct SlottedPage<'a> {
    data: &'a mut [u8; PAGE_SIZE],
}

impl<'a> SlottedPage<'a> {
    /// Format a fresh, empty block.
    pub fn init(data: &'a mut [u8; PAGE_SIZE]) -> Self {
        data.fill(0);
        let mut page = SlottedPage { data };
        page.set_num_records(0);
        page.set_end_free((PAGE_SIZE - 1) as u16);
        page
    }

    /// Wrap a block that was formatted earlier.
    pub fn wrap(data: &'a mut [u8; PAGE_SIZE]) -> Self {
        SlottedPage { data }
    }

    pub fn num_records(&self) -> u16 {
        read_u16(self.data, NUM_RECORDS_OFFSET)
    }

    fn set_num_records(&mut self, n: u16) {
        write_u16(self.data, NUM_RECORDS_OFFSET, n);
    }

    fn end_free(&self) -> u16 {
        read_u16(self.data, END_FREE_OFFSET)
    }

    fn set_end_free(&mut self, end_free: u16) {
        write_u16(self.data, END_FREE_OFFSET, end_free);
    }

    /// (size, loc) of record `id`.
    fn header(&self, id: RecordId) -> (u16, u16) {
        let offset = SLOT_SIZE * id as usize;
        (read_u16(self.data, offset), read_u16(self.data, offset + 2))
    }

    fn put_header(&mut self, id: RecordId, size: u16, loc: u16) {
        let offset = SLOT_SIZE * id as usize;
        write_u16(self.data, offset, size);
        write_u16(self.data, offset + 2, loc);
    }

    fn has_room(&self, size: usize) -> bool {
        let used_by_slots = SLOT_SIZE * (self.num_records() as usize + 1);
        let end_free = self.end_free() as usize;
        end_free >= used_by_slots && size <= end_free - used_by_slots
    }

    /// Store `record` and return its id.
    pub fn add(&mut self, record: &[u8]) -> DbResult<RecordId> {
        if !self.has_room(record.len() + SLOT_SIZE) {
            return Err(DbError::NoRoom(record.len()));
        }
        let id = self.num_records() + 1;
        let size = record.len() as u16;
        let end_free = self.end_free() - size;
        let loc = end_free + 1;
        self.set_num_records(id);
        self.set_end_free(end_free);
        self.put_header(id, size, loc);
        let start = loc as usize;
        self.data[start..start + record.len()].copy_from_slice(record);
        Ok(id)
    }

    pub fn get(&self, id: RecordId) -> Option<&[u8]> {
        if id == 0 || id > self.num_records() {
            return None;
        }
        let (size, loc) = self.header(id);
        if loc == 0 {
            return None;
        }
        let start = loc as usize;
        Some(&self.data[start..start + size as usize])
    }

    /// Remove record `id`, compacting the record area behind it.
    pub fn del(&mut self, id: RecordId) -> DbResult<()> {
        if self.get(id).is_none() {
            return Err(DbError::Relation(format!("no record {} in block", id)));
        }
        let (size, loc) = self.header(id);
        self.put_header(id, 0, 0);
        self.slide(loc, loc + size);
        Ok(())
    }

    /// Ids of the live records, in id order.
    pub fn ids(&self) -> Vec<RecordId> {
        (1..=self.num_records())
            .filter(|id| self.header(*id).1 != 0)
            .collect()
    }

    /// Close the gap `[start, end)` by moving every record stored below it
    /// up by `end - start` bytes.
    fn slide(&mut self, start: u16, end: u16) {
        let shift = end - start;
        if shift == 0 {
            return;
        }
        let free_start = self.end_free() as usize + 1;
        self.data
            .copy_within(free_start..start as usize, free_start + shift as usize);
        for id in self.ids() {
            let (size, loc) = self.header(id);
            if loc <= start {
                self.put_header(id, size, loc + shift);
            }
        }
        let end_free = self.end_free() + shift;
        self.set_end_free(end_free);
    }
}
