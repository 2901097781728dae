use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use log::debug;
use parking_lot::Mutex;

use crate::common::{PageId, PaxError, Result, PAGE_SIZE};
use crate::storage::page::FileHeaderPage;

/// DiskManager is responsible for reading and writing pages to/from disk.
/// It manages a single paged file: block 0 holds the file header with the
/// page-allocation map, page `p` lives in block `p + 1`.
pub struct DiskManager {
    /// The paged file
    db_file: Mutex<File>,
    /// Path to the paged file
    db_path: String,
    /// In-memory copy of the file header, written through on every change
    header: Mutex<Box<[u8; PAGE_SIZE]>>,
    /// Number of page reads performed
    num_reads: AtomicU32,
    /// Number of page writes performed
    num_writes: AtomicU32,
}

impl DiskManager {
    /// Creates a new paged file. Fails if the path already exists.
    pub fn create<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path_str = db_path.as_ref().to_string_lossy().to_string();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&db_path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => PaxError::FileExists(path_str.clone()),
                _ => PaxError::Io(e),
            })?;

        let mut header = Box::new([0u8; PAGE_SIZE]);
        FileHeaderPage::new(&mut header[..]).init();

        let dm = Self {
            db_file: Mutex::new(file),
            db_path: path_str,
            header: Mutex::new(header),
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        };
        dm.write_header(&dm.header.lock()[..])?;

        debug!("created paged file {}", dm.db_path);
        Ok(dm)
    }

    /// Opens an existing paged file and loads its header.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path_str = db_path.as_ref().to_string_lossy().to_string();

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&db_path)
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => PaxError::FileNotFound(path_str.clone()),
                ErrorKind::PermissionDenied => PaxError::PermissionDenied(path_str.clone()),
                _ => PaxError::Io(e),
            })?;

        let mut header = Box::new([0u8; PAGE_SIZE]);
        file.seek(SeekFrom::Start(0))?;
        let bytes_read = read_full(&mut file, &mut header[..])?;
        if bytes_read < PAGE_SIZE || !FileHeaderPage::new(&mut header[..]).is_valid() {
            return Err(PaxError::InvalidFile(path_str));
        }

        debug!("opened paged file {}", path_str);
        Ok(Self {
            db_file: Mutex::new(file),
            db_path: path_str,
            header: Mutex::new(header),
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        })
    }

    fn page_offset(page_id: PageId) -> u64 {
        (page_id.as_u32() as u64 + 1) * PAGE_SIZE as u64
    }

    /// Reads a page from disk into the provided buffer.
    /// The buffer must be exactly PAGE_SIZE bytes.
    pub fn read_page(&self, page_id: PageId, data: &mut [u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE, "Buffer must be PAGE_SIZE bytes");

        let mut file = self.db_file.lock();
        file.seek(SeekFrom::Start(Self::page_offset(page_id)))?;

        // Pages past the end of the file read as zeros
        let bytes_read = read_full(&mut *file, data)?;
        if bytes_read < PAGE_SIZE {
            data[bytes_read..].fill(0);
        }

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes a page to disk from the provided buffer.
    /// The buffer must be exactly PAGE_SIZE bytes.
    pub fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE, "Buffer must be PAGE_SIZE bytes");

        let mut file = self.db_file.lock();
        file.seek(SeekFrom::Start(Self::page_offset(page_id)))?;
        file.write_all(data)?;
        file.flush()?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Allocates the lowest free page and returns its ID.
    /// The page is zero-initialized on disk.
    pub fn allocate_page(&self) -> Result<PageId> {
        let mut header = self.header.lock();
        let page_id = FileHeaderPage::new(&mut header[..]).allocate()?;
        self.write_header(&header[..])?;
        drop(header);

        let zeros = [0u8; PAGE_SIZE];
        self.write_page(page_id, &zeros)?;

        debug!("allocated {} in {}", page_id, self.db_path);
        Ok(page_id)
    }

    /// Releases a page so a later allocation can reuse it.
    /// Returns false if the page was not allocated.
    pub fn deallocate_page(&self, page_id: PageId) -> Result<bool> {
        let mut header = self.header.lock();
        if !FileHeaderPage::new(&mut header[..]).deallocate(page_id) {
            return Ok(false);
        }
        self.write_header(&header[..])?;

        debug!("deallocated {} in {}", page_id, self.db_path);
        Ok(true)
    }

    /// Returns whether the page is currently allocated.
    pub fn is_allocated(&self, page_id: PageId) -> bool {
        let mut header = self.header.lock();
        FileHeaderPage::new(&mut header[..]).is_allocated(page_id)
    }

    /// Returns the lowest allocated page numbered `from` or higher.
    pub fn next_allocated(&self, from: u32) -> Option<PageId> {
        let mut header = self.header.lock();
        FileHeaderPage::new(&mut header[..]).next_allocated(from)
    }

    /// Returns the number of pages currently allocated.
    pub fn get_num_pages(&self) -> u32 {
        let mut header = self.header.lock();
        FileHeaderPage::new(&mut header[..]).allocated_count()
    }

    /// Returns the number of page reads performed.
    pub fn get_num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of page writes performed.
    pub fn get_num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }

    /// Returns the path to the paged file.
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }

    /// Flushes any buffered writes to disk.
    pub fn sync(&self) -> Result<()> {
        let file = self.db_file.lock();
        file.sync_all()?;
        Ok(())
    }

    fn write_header(&self, data: &[u8]) -> Result<()> {
        let mut file = self.db_file.lock();
        file.seek(SeekFrom::Start(0))?;
        file.write_all(data)?;
        file.flush()?;
        Ok(())
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        let file = self.db_file.get_mut();
        let _ = file.sync_all();
    }
}

/// Reads until the buffer is full or the file ends, returning the byte count.
fn read_full(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
