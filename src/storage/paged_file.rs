use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::buffer::{BufferPoolManager, ReadPageGuard, WritePageGuard};
use crate::common::{PageId, PaxError, Result, DEFAULT_BUFFER_POOL_SIZE};
use crate::storage::disk::DiskManager;

/// A file of fixed-size pages served through a private buffer pool.
///
/// Pages are numbered from 0. Allocation hands out the lowest unused number,
/// so pages disposed earlier are reused before the file grows. Once the file
/// is closed every operation fails with [`PaxError::InvalidHandle`].
pub struct PagedFile {
    path: PathBuf,
    bpm: Option<BufferPoolManager>,
}

impl PagedFile {
    /// Creates a new paged file. Fails if the path already exists.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::create_with_pool_size(path, DEFAULT_BUFFER_POOL_SIZE)
    }

    pub fn create_with_pool_size<P: AsRef<Path>>(path: P, pool_size: usize) -> Result<Self> {
        let dm = Arc::new(DiskManager::create(&path)?);
        info!("created paged file {}", path.as_ref().display());
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            bpm: Some(BufferPoolManager::new(pool_size, dm)),
        })
    }

    /// Opens an existing paged file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_pool_size(path, DEFAULT_BUFFER_POOL_SIZE)
    }

    pub fn open_with_pool_size<P: AsRef<Path>>(path: P, pool_size: usize) -> Result<Self> {
        let dm = Arc::new(DiskManager::open(&path)?);
        info!(
            "opened paged file {} ({} pages)",
            path.as_ref().display(),
            dm.get_num_pages()
        );
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            bpm: Some(BufferPoolManager::new(pool_size, dm)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.bpm.is_some()
    }

    fn pool(&self) -> Result<&BufferPoolManager> {
        self.bpm.as_ref().ok_or(PaxError::InvalidHandle)
    }

    /// Allocates a zeroed page and returns it pinned for writing.
    pub fn allocate_page(&self) -> Result<WritePageGuard<'_>> {
        self.pool()?.new_page()
    }

    pub fn read_page(&self, page_id: PageId) -> Result<ReadPageGuard<'_>> {
        let pool = self.pool()?;
        if !pool.disk_manager().is_allocated(page_id) {
            return Err(PaxError::PageNotFound(page_id));
        }
        pool.fetch_read(page_id)
    }

    pub fn write_page(&self, page_id: PageId) -> Result<WritePageGuard<'_>> {
        let pool = self.pool()?;
        if !pool.disk_manager().is_allocated(page_id) {
            return Err(PaxError::PageNotFound(page_id));
        }
        pool.fetch_write(page_id)
    }

    /// Returns whether the page is currently allocated.
    pub fn contains_page(&self, page_id: PageId) -> Result<bool> {
        Ok(self.pool()?.disk_manager().is_allocated(page_id))
    }

    /// Returns the lowest allocated page.
    pub fn first_page(&self) -> Result<Option<PageId>> {
        Ok(self.pool()?.disk_manager().next_allocated(0))
    }

    /// Returns the lowest allocated page after `page_id`.
    pub fn next_page(&self, page_id: PageId) -> Result<Option<PageId>> {
        let pool = self.pool()?;
        Ok(page_id
            .as_u32()
            .checked_add(1)
            .and_then(|from| pool.disk_manager().next_allocated(from)))
    }

    /// Releases a page. It must not be pinned by a live guard.
    pub fn dispose_page(&self, page_id: PageId) -> Result<()> {
        if !self.pool()?.delete_page(page_id)? {
            return Err(PaxError::PageNotFound(page_id));
        }
        debug!("disposed {} in {}", page_id, self.path.display());
        Ok(())
    }

    /// Returns the number of allocated pages.
    pub fn page_count(&self) -> Result<u32> {
        Ok(self.pool()?.disk_manager().get_num_pages())
    }

    /// Writes every dirty page back and syncs the file.
    pub fn force_all_pages(&self) -> Result<()> {
        let pool = self.pool()?;
        pool.flush_all_pages()?;
        pool.disk_manager().sync()
    }

    /// Forces all pages and releases the buffer pool.
    pub fn close(&mut self) -> Result<()> {
        let pool = self.bpm.take().ok_or(PaxError::InvalidHandle)?;
        pool.flush_all_pages()?;
        pool.disk_manager().sync()?;
        info!("closed paged file {}", self.path.display());
        Ok(())
    }
}

impl Drop for PagedFile {
    fn drop(&mut self) {
        if let Some(pool) = &self.bpm {
            if let Err(e) = pool.flush_all_pages() {
                warn!("failed to flush {} on drop: {}", self.path.display(), e);
            }
        }
    }
}
