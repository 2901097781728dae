use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::info;

use crate::common::{PaxError, Result, DEFAULT_BUFFER_POOL_SIZE, SCHEMA_PAGE_ID};
use crate::storage::PagedFile;

use super::record_file::layout_for;
use super::{decode_schema, encode_schema, AttrInfo, RecordFile, RecordFileScan};

/// Creates, opens and destroys relation files.
///
/// Every file opened through the manager gets its own buffer pool of
/// `pool_size` frames.
#[derive(Debug, Clone)]
pub struct RecordFileManager {
    pool_size: usize,
}

impl RecordFileManager {
    pub fn new() -> Self {
        Self::with_pool_size(DEFAULT_BUFFER_POOL_SIZE)
    }

    pub fn with_pool_size(pool_size: usize) -> Self {
        Self { pool_size }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Creates a relation file at `path` with the schema block on page 0.
    /// Fails with [`PaxError::FileExists`] if anything already lives there.
    pub fn create_file<P: AsRef<Path>>(&self, path: P, attrs: &[AttrInfo]) -> Result<RecordFile> {
        let path = path.as_ref();
        let block = encode_schema(attrs)?;
        layout_for(attrs)?;

        let file = PagedFile::create_with_pool_size(path, self.pool_size)?;
        {
            let mut page = file.allocate_page()?;
            if page.page_id() != SCHEMA_PAGE_ID {
                return Err(PaxError::InvalidFile(format!(
                    "fresh file {} handed out {} for the schema",
                    path.display(),
                    page.page_id()
                )));
            }
            page.data_mut()[..block.len()].copy_from_slice(&block);
        }
        file.force_all_pages()?;

        info!(
            "created relation file {} with {} attributes",
            path.display(),
            attrs.len()
        );
        RecordFile::new(attrs.to_vec(), file)
    }

    /// Opens an existing relation file and reads its schema back from page 0.
    pub fn open_file<P: AsRef<Path>>(&self, path: P) -> Result<RecordFile> {
        let path = path.as_ref();
        let file = PagedFile::open_with_pool_size(path, self.pool_size)?;
        let attrs = {
            let page = file.read_page(SCHEMA_PAGE_ID).map_err(|e| match e {
                PaxError::PageNotFound(_) => PaxError::InvalidSchema(format!(
                    "{} has no schema page",
                    path.display()
                )),
                e => e,
            })?;
            decode_schema(page.data())?
        };

        info!(
            "opened relation file {} with {} attributes",
            path.display(),
            attrs.len()
        );
        RecordFile::new(attrs, file)
    }

    /// Removes the file at `path`. A missing file is not an error.
    pub fn destroy_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        match fs::remove_file(path) {
            Ok(()) => {
                info!("destroyed relation file {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                Err(PaxError::PermissionDenied(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Returns a scan that is not yet bound to any file.
    pub fn create_scan<'a>(&self) -> RecordFileScan<'a> {
        RecordFileScan::new()
    }
}

impl Default for RecordFileManager {
    fn default() -> Self {
        Self::new()
    }
}
