use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::common::{FrameId, PageId, PaxError, Result, PAGE_SIZE};
use crate::storage::disk::{DiskManager, DiskScheduler};

use super::{FrameHeader, LruReplacer, ReadPageGuard, WritePageGuard};

/// BufferPoolManager caches the pages of one paged file in a fixed number of
/// frames. Pages are pinned while a guard is alive; unpinned frames are
/// recycled in least-recently-used order, writing dirty pages back first.
pub struct BufferPoolManager {
    /// The buffer pool frames
    frames: Vec<FrameHeader>,
    /// Page table: maps page IDs to frame IDs
    page_table: Mutex<HashMap<PageId, FrameId>>,
    /// Frames that hold no page
    free_list: Mutex<VecDeque<FrameId>>,
    /// Eviction policy over unpinned frames
    replacer: LruReplacer,
    /// Disk scheduler for page I/O
    disk_scheduler: DiskScheduler,
}

impl BufferPoolManager {
    /// Creates a new BufferPoolManager with the given pool size over a disk manager.
    pub fn new(pool_size: usize, disk_manager: Arc<DiskManager>) -> Self {
        let frames = (0..pool_size)
            .map(|i| FrameHeader::new(FrameId::new(i as u32)))
            .collect();
        let free_list = (0..pool_size).map(|i| FrameId::new(i as u32)).collect();

        Self {
            frames,
            page_table: Mutex::new(HashMap::new()),
            free_list: Mutex::new(free_list),
            replacer: LruReplacer::new(),
            disk_scheduler: DiskScheduler::new(disk_manager),
        }
    }

    /// Allocates a new zeroed page on disk and returns it pinned for writing.
    pub fn new_page(&self) -> Result<WritePageGuard<'_>> {
        let mut page_table = self.page_table.lock();
        let frame_id = self.get_free_frame(&mut page_table)?;

        let page_id = match self.disk_scheduler.disk_manager().allocate_page() {
            Ok(page_id) => page_id,
            Err(e) => {
                self.free_list.lock().push_back(frame_id);
                return Err(e);
            }
        };

        let frame = &self.frames[frame_id.as_usize()];
        frame.reset();
        frame.set_page_id(page_id);
        frame.pin();
        page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id);
        drop(page_table);

        debug!("new page {} in {}", page_id, frame_id);
        let mut guard = WritePageGuard::new(page_id, self, frame.data.write());
        guard.mark_dirty();
        Ok(guard)
    }

    /// Drops a page from the pool and releases it on disk.
    /// Fails if a guard on the page is still alive. Returns false if the page
    /// was not allocated.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut page_table = self.page_table.lock();

        if let Some(&frame_id) = page_table.get(&page_id) {
            let frame = &self.frames[frame_id.as_usize()];
            if frame.pin_count() > 0 {
                return Err(PaxError::PageStillPinned(page_id));
            }

            page_table.remove(&page_id);
            frame.reset();
            self.replacer.remove(frame_id);
            self.free_list.lock().push_back(frame_id);
        }

        self.disk_scheduler
            .disk_manager()
            .deallocate_page(page_id)
    }

    /// Fetches a page for read access.
    pub fn fetch_read(&self, page_id: PageId) -> Result<ReadPageGuard<'_>> {
        let frame_id = self.fetch_page(page_id)?;
        let frame = &self.frames[frame_id.as_usize()];
        Ok(ReadPageGuard::new(page_id, self, frame.data.read()))
    }

    /// Fetches a page for write access.
    pub fn fetch_write(&self, page_id: PageId) -> Result<WritePageGuard<'_>> {
        let frame_id = self.fetch_page(page_id)?;
        let frame = &self.frames[frame_id.as_usize()];
        Ok(WritePageGuard::new(page_id, self, frame.data.write()))
    }

    /// Flushes a specific page to disk. Returns false if it is not cached.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        let page_table = self.page_table.lock();

        match page_table.get(&page_id) {
            Some(&frame_id) => {
                self.write_back(&self.frames[frame_id.as_usize()], page_id)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Flushes every dirty cached page to disk.
    pub fn flush_all_pages(&self) -> Result<()> {
        let page_table = self.page_table.lock();

        for (&page_id, &frame_id) in page_table.iter() {
            let frame = &self.frames[frame_id.as_usize()];
            if frame.is_dirty() {
                self.write_back(frame, page_id)?;
            }
        }

        Ok(())
    }

    /// Returns the pin count for a cached page.
    pub fn get_pin_count(&self, page_id: PageId) -> Option<u32> {
        let page_table = self.page_table.lock();

        page_table
            .get(&page_id)
            .map(|&frame_id| self.frames[frame_id.as_usize()].pin_count())
    }

    pub fn pool_size(&self) -> usize {
        self.frames.len()
    }

    /// Returns the number of frames holding no page.
    pub fn free_frame_count(&self) -> usize {
        self.free_list.lock().len()
    }

    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        self.disk_scheduler.disk_manager()
    }

    /// Called by page guards on drop.
    pub(crate) fn release(&self, page_id: PageId, is_dirty: bool) {
        let page_table = self.page_table.lock();
        if let Some(&frame_id) = page_table.get(&page_id) {
            let frame = &self.frames[frame_id.as_usize()];
            if is_dirty {
                frame.set_dirty(true);
            }
            if let Some(0) = frame.unpin() {
                self.replacer.set_evictable(frame_id, true);
            }
        }
    }

    /// Pins a page in the pool, reading it from disk on a miss.
    fn fetch_page(&self, page_id: PageId) -> Result<FrameId> {
        let mut page_table = self.page_table.lock();

        if let Some(&frame_id) = page_table.get(&page_id) {
            self.frames[frame_id.as_usize()].pin();
            self.replacer.record_access(frame_id);
            self.replacer.set_evictable(frame_id, false);
            return Ok(frame_id);
        }

        let frame_id = self.get_free_frame(&mut page_table)?;
        let frame = &self.frames[frame_id.as_usize()];

        let mut data = [0u8; PAGE_SIZE];
        if let Err(e) = self.disk_scheduler.schedule_read_sync(page_id, &mut data) {
            self.free_list.lock().push_back(frame_id);
            return Err(e);
        }

        frame.set_page_id(page_id);
        frame.copy_from(&data);
        frame.set_dirty(false);
        frame.pin();

        page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id);

        Ok(frame_id)
    }

    /// Gets a free frame, either from the free list or by evicting a page.
    fn get_free_frame(&self, page_table: &mut HashMap<PageId, FrameId>) -> Result<FrameId> {
        if let Some(frame_id) = self.free_list.lock().pop_front() {
            return Ok(frame_id);
        }

        let frame_id = self.replacer.evict().ok_or(PaxError::BufferPoolFull)?;
        let frame = &self.frames[frame_id.as_usize()];

        if let Some(old_page_id) = frame.page_id() {
            if frame.is_dirty() {
                self.write_back(frame, old_page_id)?;
            }
            page_table.remove(&old_page_id);
            debug!("evicted {} from {}", old_page_id, frame_id);
        }
        frame.reset();

        Ok(frame_id)
    }

    fn write_back(&self, frame: &FrameHeader, page_id: PageId) -> Result<()> {
        let mut data = [0u8; PAGE_SIZE];
        frame.copy_to(&mut data);
        self.disk_scheduler.schedule_write_sync(page_id, &data)?;
        frame.set_dirty(false);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_bpm(pool_size: usize) -> (BufferPoolManager, TempDir) {
        let dir = TempDir::new().unwrap();
        let dm = Arc::new(DiskManager::create(dir.path().join("bpm.pf")).unwrap());
        (BufferPoolManager::new(pool_size, dm), dir)
    }

    #[test]
    fn test_buffer_pool_manager_new_page() {
        let (bpm, _dir) = create_bpm(4);
        assert_eq!(bpm.pool_size(), 4);
        assert_eq!(bpm.free_frame_count(), 4);

        let guard = bpm.new_page().unwrap();
        let page_id = guard.page_id();
        assert_eq!(page_id, PageId::new(0));
        assert!(guard.is_dirty());
        assert_eq!(bpm.get_pin_count(page_id), Some(1));
        drop(guard);

        assert_eq!(bpm.get_pin_count(page_id), Some(0));
        assert_eq!(bpm.free_frame_count(), 3);
    }

    #[test]
    fn test_buffer_pool_manager_read_write() {
        let (bpm, _dir) = create_bpm(4);
        let page_id = bpm.new_page().unwrap().page_id();

        {
            let mut guard = bpm.fetch_write(page_id).unwrap();
            guard.data_mut()[0] = 42;
            guard[100] = 255;
        }

        let guard = bpm.fetch_read(page_id).unwrap();
        assert_eq!(guard.data()[0], 42);
        assert_eq!(guard[100], 255);
    }

    #[test]
    fn test_buffer_pool_manager_eviction_writes_back() {
        let (bpm, _dir) = create_bpm(2);

        let page_ids: Vec<_> = (0..4)
            .map(|i| {
                let mut guard = bpm.new_page().unwrap();
                guard.data_mut()[0] = i as u8 + 10;
                guard.page_id()
            })
            .collect();

        // Only two frames: the first pages must have been evicted and written back
        for (i, &page_id) in page_ids.iter().enumerate() {
            let guard = bpm.fetch_read(page_id).unwrap();
            assert_eq!(guard.data()[0], i as u8 + 10);
        }
    }

    #[test]
    fn test_buffer_pool_manager_full() {
        let (bpm, _dir) = create_bpm(2);

        let _guard1 = bpm.new_page().unwrap();
        let _guard2 = bpm.new_page().unwrap();

        assert!(matches!(bpm.new_page(), Err(PaxError::BufferPoolFull)));
        // The failed allocation must not leak a disk page
        assert_eq!(bpm.disk_manager().get_num_pages(), 2);
    }

    #[test]
    fn test_buffer_pool_manager_delete_page() {
        let (bpm, _dir) = create_bpm(4);
        let page_id = bpm.new_page().unwrap().page_id();

        {
            let _guard = bpm.fetch_read(page_id).unwrap();
            assert!(matches!(
                bpm.delete_page(page_id),
                Err(PaxError::PageStillPinned(_))
            ));
        }

        assert!(bpm.delete_page(page_id).unwrap());
        assert_eq!(bpm.get_pin_count(page_id), None);
        assert!(!bpm.disk_manager().is_allocated(page_id));
        assert!(!bpm.delete_page(page_id).unwrap());
    }

    #[test]
    fn test_buffer_pool_manager_flush() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flush.pf");

        let page_id = {
            let dm = Arc::new(DiskManager::create(&path).unwrap());
            let bpm = BufferPoolManager::new(4, dm);
            let page_id = {
                let mut guard = bpm.new_page().unwrap();
                guard.data_mut()[7] = 99;
                guard.page_id()
            };
            assert!(bpm.flush_page(page_id).unwrap());
            page_id
        };

        let dm = Arc::new(DiskManager::open(&path).unwrap());
        let bpm = BufferPoolManager::new(4, dm);
        assert_eq!(bpm.fetch_read(page_id).unwrap().data()[7], 99);
    }
}
