use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{PageId, PAGE_SIZE};

use super::BufferPoolManager;

/// RAII guard for read-only access to a page.
/// Holds a pin on the frame and unpins it when dropped.
pub struct ReadPageGuard<'a> {
    page_id: PageId,
    bpm: &'a BufferPoolManager,
    data: RwLockReadGuard<'a, Box<[u8; PAGE_SIZE]>>,
}

impl<'a> ReadPageGuard<'a> {
    /// The frame must already be pinned on behalf of this guard.
    pub(crate) fn new(
        page_id: PageId,
        bpm: &'a BufferPoolManager,
        data: RwLockReadGuard<'a, Box<[u8; PAGE_SIZE]>>,
    ) -> Self {
        Self { page_id, bpm, data }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..]
    }
}

impl Deref for ReadPageGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data()
    }
}

impl Drop for ReadPageGuard<'_> {
    fn drop(&mut self) {
        self.bpm.release(self.page_id, false);
    }
}

/// RAII guard for read-write access to a page.
/// Mutating the data marks the page dirty; the pin is released on drop.
pub struct WritePageGuard<'a> {
    page_id: PageId,
    bpm: &'a BufferPoolManager,
    data: RwLockWriteGuard<'a, Box<[u8; PAGE_SIZE]>>,
    is_dirty: bool,
}

impl<'a> WritePageGuard<'a> {
    /// The frame must already be pinned on behalf of this guard.
    pub(crate) fn new(
        page_id: PageId,
        bpm: &'a BufferPoolManager,
        data: RwLockWriteGuard<'a, Box<[u8; PAGE_SIZE]>>,
    ) -> Self {
        Self {
            page_id,
            bpm,
            data,
            is_dirty: false,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..]
    }

    /// Returns a mutable reference to the page data.
    /// Automatically marks the page as dirty.
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.is_dirty = true;
        &mut self.data[..]
    }

    /// Marks the page dirty without touching its data.
    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }
}

impl Deref for WritePageGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data()
    }
}

impl DerefMut for WritePageGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.data_mut()
    }
}

impl Drop for WritePageGuard<'_> {
    fn drop(&mut self) {
        // Unpinning does not touch the data lock, which is released right after
        self.bpm.release(self.page_id, self.is_dirty);
    }
}
