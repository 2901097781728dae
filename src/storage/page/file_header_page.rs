use crate::common::bitmap;
use crate::common::{PageId, PaxError, Result, FILE_MAGIC, FILE_VERSION, PAGE_SIZE};

/// File header layout (block 0 of every paged file, outside the page numbering):
///
/// +----------------------+
/// | magic (4)            |
/// | version (4)          |
/// | page_count (4)       |  high-water mark: pages ever appended to the file
/// | allocated_count (4)  |  pages currently in use
/// +----------------------+
/// | allocation bitmap    |  one bit per page, MSB-first, 1 = in use
/// +----------------------+
const MAGIC_OFFSET: usize = 0;
const VERSION_OFFSET: usize = 4;
const PAGE_COUNT_OFFSET: usize = 8;
const ALLOCATED_COUNT_OFFSET: usize = 12;
const BITMAP_OFFSET: usize = 16;

/// Maximum number of pages one paged file can address.
pub const MAX_PAGES: usize = (PAGE_SIZE - BITMAP_OFFSET) * 8;

pub struct FileHeaderPage<'a> {
    data: &'a mut [u8],
}

impl<'a> FileHeaderPage<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        Self { data }
    }

    pub fn init(&mut self) {
        self.data.fill(0);
        self.write_u32(MAGIC_OFFSET, FILE_MAGIC);
        self.write_u32(VERSION_OFFSET, FILE_VERSION);
        self.set_page_count(0);
        self.set_allocated_count(0);
    }

    pub fn is_valid(&self) -> bool {
        self.magic() == FILE_MAGIC && self.version() == FILE_VERSION
    }

    pub fn magic(&self) -> u32 {
        self.read_u32(MAGIC_OFFSET)
    }

    pub fn version(&self) -> u32 {
        self.read_u32(VERSION_OFFSET)
    }

    pub fn page_count(&self) -> u32 {
        self.read_u32(PAGE_COUNT_OFFSET)
    }

    fn set_page_count(&mut self, count: u32) {
        self.write_u32(PAGE_COUNT_OFFSET, count);
    }

    pub fn allocated_count(&self) -> u32 {
        self.read_u32(ALLOCATED_COUNT_OFFSET)
    }

    fn set_allocated_count(&mut self, count: u32) {
        self.write_u32(ALLOCATED_COUNT_OFFSET, count);
    }

    fn bitmap(&self) -> &[u8] {
        &self.data[BITMAP_OFFSET..]
    }

    pub fn is_allocated(&self, page_id: PageId) -> bool {
        page_id.as_u32() < self.page_count() && bitmap::get(self.bitmap(), page_id.as_usize())
    }

    /// Marks the lowest unused page as allocated and returns it. Pages freed by
    /// `deallocate` are handed out again before the file grows.
    pub fn allocate(&mut self) -> Result<PageId> {
        let page = bitmap::first_clear(self.bitmap(), MAX_PAGES)
            .ok_or(PaxError::FileFull { max_pages: MAX_PAGES })?;

        bitmap::set(&mut self.data[BITMAP_OFFSET..], page, true);
        self.set_allocated_count(self.allocated_count() + 1);
        if page as u32 >= self.page_count() {
            self.set_page_count(page as u32 + 1);
        }

        Ok(PageId::new(page as u32))
    }

    /// Returns false if the page was not allocated.
    pub fn deallocate(&mut self, page_id: PageId) -> bool {
        if !self.is_allocated(page_id) {
            return false;
        }
        bitmap::set(&mut self.data[BITMAP_OFFSET..], page_id.as_usize(), false);
        self.set_allocated_count(self.allocated_count() - 1);
        true
    }

    /// Returns the lowest allocated page numbered `from` or higher.
    pub fn next_allocated(&self, from: u32) -> Option<PageId> {
        bitmap::next_set(self.bitmap(), from as usize, self.page_count() as usize)
            .map(|page| PageId::new(page as u32))
    }

    fn read_u32(&self, offset: usize) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[offset..offset + 4]);
        u32::from_le_bytes(bytes)
    }

    fn write_u32(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }
}
