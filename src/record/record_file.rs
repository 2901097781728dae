use std::collections::BTreeSet;

use log::{debug, warn};

use crate::common::{PageId, PaxError, Result, Rid, SlotId, SCHEMA_PAGE_ID};
use crate::storage::page::{PageLayout, RecordPage};
use crate::storage::PagedFile;

use super::{AttrInfo, Record, UpdateResult};

/// An open relation file: fixed-size records stored in PAX record pages.
///
/// Page 0 holds the schema block; every other allocated page is a record
/// page with at least one live record. A page whose last record is deleted is
/// disposed right away, and its number is reused by a later allocation.
///
/// Pages with a free slot are tracked in an ordered set so that inserts
/// always fill the lowest-numbered page first.
pub struct RecordFile {
    attrs: Vec<AttrInfo>,
    layout: PageLayout,
    file: PagedFile,
    free_pages: BTreeSet<PageId>,
    /// Allocated pages including the schema page; 0 means "not known".
    used_pages: u32,
}

impl RecordFile {
    /// Wraps an open paged file whose page 0 already holds the schema block
    /// for `attrs`. Walks the record pages once to find the ones with room.
    pub fn new(attrs: Vec<AttrInfo>, file: PagedFile) -> Result<Self> {
        if !file.is_open() {
            return Err(PaxError::InvalidHandle);
        }
        let layout = layout_for(&attrs)?;

        let mut record_file = Self {
            attrs,
            layout,
            file,
            free_pages: BTreeSet::new(),
            used_pages: 0,
        };
        record_file.used_pages = record_file.load_free_pages()?;
        debug!(
            "record file {}: {} slots per page, {} pages, {} with room",
            record_file.file.path().display(),
            record_file.layout.slots_per_page(),
            record_file.used_pages,
            record_file.free_pages.len()
        );
        Ok(record_file)
    }

    /// Fills the free-page set and returns the number of allocated pages.
    fn load_free_pages(&mut self) -> Result<u32> {
        self.free_pages.clear();
        let mut pages = 1;
        let mut next = self.file.next_page(SCHEMA_PAGE_ID)?;
        while let Some(page_id) = next {
            let page = self.file.read_page(page_id)?;
            if !self.layout.is_full(page.data()) {
                self.free_pages.insert(page_id);
            }
            drop(page);
            pages += 1;
            next = self.file.next_page(page_id)?;
        }
        Ok(pages)
    }

    pub fn attributes(&self) -> &[AttrInfo] {
        &self.attrs
    }

    /// Length every raw record passed to insert or update must have.
    pub fn record_size(&self) -> usize {
        self.layout.record_size()
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    /// Record pages with at least one free slot, lowest first.
    pub fn free_pages(&self) -> impl Iterator<Item = PageId> + '_ {
        self.free_pages.iter().copied()
    }

    pub fn is_open(&self) -> bool {
        self.file.is_open()
    }

    fn check_rid(&self, rid: Rid) -> Result<()> {
        if rid.page_id == SCHEMA_PAGE_ID || !self.layout.contains_slot(rid.slot_id) {
            return Err(PaxError::InvalidRid(rid));
        }
        Ok(())
    }

    fn check_size(&self, actual: usize) -> Result<()> {
        let expected = self.layout.record_size();
        if actual != expected {
            return Err(PaxError::RecordSizeMismatch { expected, actual });
        }
        Ok(())
    }

    /// Stores a raw record in the lowest free slot of the lowest page with
    /// room, allocating a new page when every record page is full.
    pub fn insert_record(&mut self, data: &[u8]) -> Result<Rid> {
        self.check_size(data.len())?;

        while let Some(page_id) = self.free_pages.first().copied() {
            let mut guard = self.file.write_page(page_id)?;
            let mut page = RecordPage::new(&self.layout, guard.data_mut());
            match page.first_free_slot() {
                Some(slot) => {
                    page.set_occupied(slot, true);
                    page.write_record(slot, data);
                    if page.is_full() {
                        self.free_pages.remove(&page_id);
                    }
                    return Ok(Rid::new(page_id, slot));
                }
                None => {
                    warn!("{} was tracked as having room but is full", page_id);
                    self.free_pages.remove(&page_id);
                }
            }
        }

        let mut guard = self.file.allocate_page()?;
        let page_id = guard.page_id();
        let mut page = RecordPage::new(&self.layout, guard.data_mut());
        page.init();
        let slot = SlotId::new(0);
        page.set_occupied(slot, true);
        page.write_record(slot, data);
        if !page.is_full() {
            self.free_pages.insert(page_id);
        }
        if self.used_pages > 0 {
            self.used_pages += 1;
        }
        debug!("allocated record page {}", page_id);
        Ok(Rid::new(page_id, slot))
    }

    /// Frees the record's slot. Deleting a free slot, or a slot on a page that
    /// no longer exists, changes nothing. A page left with no live record is
    /// disposed.
    pub fn delete_record(&mut self, rid: Rid) -> Result<()> {
        self.check_rid(rid)?;
        if !self.file.contains_page(rid.page_id)? {
            return Ok(());
        }

        let now_empty = {
            let mut guard = self.file.write_page(rid.page_id)?;
            if !self.layout.is_occupied(guard.data(), rid.slot_id) {
                return Ok(());
            }
            let mut page = RecordPage::new(&self.layout, guard.data_mut());
            page.set_occupied(rid.slot_id, false);
            page.is_empty()
        };

        if now_empty {
            self.file.dispose_page(rid.page_id)?;
            self.free_pages.remove(&rid.page_id);
            self.used_pages = self.used_pages.saturating_sub(1);
            debug!("disposed empty record page {}", rid.page_id);
        } else {
            self.free_pages.insert(rid.page_id);
        }
        Ok(())
    }

    /// Overwrites the live record at `record.rid()` in place.
    pub fn update_record(&mut self, record: &Record) -> Result<UpdateResult> {
        let rid = record.rid();
        self.check_rid(rid)?;
        self.check_size(record.len())?;

        if !self.file.contains_page(rid.page_id)? {
            warn!("update of {} ignored: page does not exist", rid);
            return Ok(UpdateResult::Ignored);
        }
        let mut guard = self.file.write_page(rid.page_id)?;
        if !self.layout.is_occupied(guard.data(), rid.slot_id) {
            warn!("update of {} ignored: slot is free", rid);
            return Ok(UpdateResult::Ignored);
        }
        RecordPage::new(&self.layout, guard.data_mut()).write_record(rid.slot_id, record.data());
        Ok(UpdateResult::Applied)
    }

    /// Returns a copy of the live record at `rid`.
    pub fn get_record(&self, rid: Rid) -> Result<Option<Record>> {
        self.check_rid(rid)?;
        if !self.file.contains_page(rid.page_id)? {
            return Ok(None);
        }
        let guard = self.file.read_page(rid.page_id)?;
        if !self.layout.is_occupied(guard.data(), rid.slot_id) {
            return Ok(None);
        }
        Ok(Some(Record::new(
            rid,
            self.layout.read_record(guard.data(), rid.slot_id),
        )))
    }

    /// Returns the record with the smallest rid.
    pub fn get_first_record(&self) -> Result<Option<Record>> {
        self.find_from(self.file.next_page(SCHEMA_PAGE_ID)?, 0)
    }

    /// Returns the record with the smallest rid strictly greater than `rid`.
    /// `rid` itself need not be live.
    pub fn get_next_record(&self, rid: Rid) -> Result<Option<Record>> {
        self.check_rid(rid)?;
        if self.file.contains_page(rid.page_id)? {
            self.find_from(Some(rid.page_id), rid.slot_id.as_usize() + 1)
        } else {
            self.find_from(self.file.next_page(rid.page_id)?, 0)
        }
    }

    fn find_from(&self, mut next: Option<PageId>, mut from_slot: usize) -> Result<Option<Record>> {
        while let Some(page_id) = next {
            let guard = self.file.read_page(page_id)?;
            if let Some(slot) = self.layout.next_occupied(guard.data(), from_slot) {
                let data = self.layout.read_record(guard.data(), slot);
                return Ok(Some(Record::new(Rid::new(page_id, slot), data)));
            }
            drop(guard);
            next = self.file.next_page(page_id)?;
            from_slot = 0;
        }
        Ok(None)
    }

    /// Number of allocated pages, the schema page included.
    pub fn num_pages(&mut self) -> Result<u32> {
        if self.used_pages == 0 {
            self.used_pages = self.load_free_pages()?;
        }
        Ok(self.used_pages)
    }

    /// Writes every modified page back to disk.
    pub fn force_all(&self) -> Result<()> {
        self.file.force_all_pages()
    }

    /// Flushes and closes the underlying file. Later operations fail with
    /// [`PaxError::InvalidHandle`].
    pub fn close(&mut self) -> Result<()> {
        self.file.close()
    }

    /// Kept for interface symmetry with the file manager; the on-disk file is
    /// removed by `RecordFileManager::destroy_file`.
    pub fn destroy(&mut self) -> Result<()> {
        debug!("destroy on {} is a no-op", self.file.path().display());
        Ok(())
    }
}

/// Page geometry for a relation with the given attributes.
pub(crate) fn layout_for(attrs: &[AttrInfo]) -> Result<PageLayout> {
    let lengths: Vec<usize> = attrs.iter().map(AttrInfo::byte_length).collect();
    PageLayout::new(&lengths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{encode_schema, AttrType};
    use tempfile::TempDir;

    fn int_pair() -> Vec<AttrInfo> {
        vec![
            AttrInfo::new("t", "a", AttrType::Integer, 4),
            AttrInfo::new("t", "b", AttrType::BigInt, 8),
        ]
    }

    fn new_record_file(dir: &TempDir, attrs: Vec<AttrInfo>) -> RecordFile {
        let file = PagedFile::create(dir.path().join("t.rel")).unwrap();
        {
            let block = encode_schema(&attrs).unwrap();
            let mut page = file.allocate_page().unwrap();
            page.data_mut()[..block.len()].copy_from_slice(&block);
        }
        RecordFile::new(attrs, file).unwrap()
    }

    fn row(n: u32) -> Vec<u8> {
        let mut row = n.to_be_bytes().to_vec();
        row.extend_from_slice(&u64::from(n).to_le_bytes());
        row
    }

    #[test]
    fn test_insert_fills_lowest_slot() {
        let dir = TempDir::new().unwrap();
        let mut rf = new_record_file(&dir, int_pair());

        let r0 = rf.insert_record(&row(0)).unwrap();
        let r1 = rf.insert_record(&row(1)).unwrap();
        assert_eq!(r0, Rid::new(PageId::new(1), SlotId::new(0)));
        assert_eq!(r1, Rid::new(PageId::new(1), SlotId::new(1)));

        rf.delete_record(r0).unwrap();
        assert_eq!(rf.insert_record(&row(2)).unwrap(), r0);
        assert_eq!(rf.get_record(r0).unwrap().unwrap().data(), &row(2)[..]);
    }

    #[test]
    fn test_rejects_bad_input() {
        let dir = TempDir::new().unwrap();
        let mut rf = new_record_file(&dir, int_pair());

        assert!(matches!(
            rf.insert_record(&[0u8; 5]),
            Err(PaxError::RecordSizeMismatch { expected: 12, actual: 5 })
        ));

        let schema_rid = Rid::new(SCHEMA_PAGE_ID, SlotId::new(0));
        assert!(matches!(rf.get_record(schema_rid), Err(PaxError::InvalidRid(_))));

        let past_end = Rid::new(PageId::new(1), SlotId::new(254));
        assert!(matches!(rf.delete_record(past_end), Err(PaxError::InvalidRid(_))));
    }

    #[test]
    fn test_free_page_tracking() {
        let dir = TempDir::new().unwrap();
        let mut rf = new_record_file(&dir, int_pair());
        let per_page = rf.layout().slots_per_page() as u32;

        for i in 0..per_page {
            rf.insert_record(&row(i)).unwrap();
        }
        assert_eq!(rf.free_pages().count(), 0);

        let spill = rf.insert_record(&row(per_page)).unwrap();
        assert_eq!(spill.page_id, PageId::new(2));
        assert_eq!(rf.free_pages().collect::<Vec<_>>(), vec![PageId::new(2)]);

        rf.delete_record(Rid::new(PageId::new(1), SlotId::new(9))).unwrap();
        assert_eq!(
            rf.free_pages().collect::<Vec<_>>(),
            vec![PageId::new(1), PageId::new(2)]
        );
        assert_eq!(
            rf.insert_record(&row(0)).unwrap(),
            Rid::new(PageId::new(1), SlotId::new(9))
        );
    }

    #[test]
    fn test_update_free_slot_is_ignored() {
        let dir = TempDir::new().unwrap();
        let mut rf = new_record_file(&dir, int_pair());
        let rid = rf.insert_record(&row(1)).unwrap();
        let other = rf.insert_record(&row(2)).unwrap();
        rf.delete_record(other).unwrap();

        let stale = Record::new(other, row(9));
        assert_eq!(rf.update_record(&stale).unwrap(), UpdateResult::Ignored);
        assert_eq!(rf.get_record(other).unwrap(), None);

        let fresh = Record::new(rid, row(7));
        assert_eq!(rf.update_record(&fresh).unwrap(), UpdateResult::Applied);
        assert_eq!(rf.get_record(rid).unwrap(), Some(fresh));
    }

    #[test]
    fn test_closed_file_rejects_operations() {
        let dir = TempDir::new().unwrap();
        let mut rf = new_record_file(&dir, int_pair());
        rf.insert_record(&row(1)).unwrap();
        rf.close().unwrap();

        assert!(!rf.is_open());
        assert!(matches!(rf.insert_record(&row(2)), Err(PaxError::InvalidHandle)));
        assert!(matches!(rf.get_first_record(), Err(PaxError::InvalidHandle)));
        assert!(matches!(rf.close(), Err(PaxError::InvalidHandle)));
    }
}
