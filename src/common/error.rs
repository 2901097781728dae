use thiserror::Error;

use super::types::{PageId, Rid};

/// Record manager error types
#[derive(Error, Debug)]
pub enum PaxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File {0} not found")]
    FileNotFound(String),

    #[error("File {0} already exists")]
    FileExists(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid paged file: {0}")]
    InvalidFile(String),

    #[error("File handle is closed or missing")]
    InvalidHandle,

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Schema serialization failed: {0}")]
    Serialization(String),

    #[error("Page {0} not found")]
    PageNotFound(PageId),

    #[error("Invalid page ID: {0}")]
    InvalidPageId(PageId),

    #[error("Page {0} is still pinned")]
    PageStillPinned(PageId),

    #[error("Buffer pool is full, no evictable frames available")]
    BufferPoolFull,

    #[error("Paged file is full ({max_pages} pages)")]
    FileFull { max_pages: usize },

    #[error("Disk scheduler error: {0}")]
    DiskScheduler(String),

    #[error("Invalid record id: {0}")]
    InvalidRid(Rid),

    #[error("Record size mismatch: expected {expected} bytes, got {actual}")]
    RecordSizeMismatch { expected: usize, actual: usize },

    #[error("Attribute {0} is not part of the relation")]
    UnknownAttribute(String),
}

pub type Result<T> = std::result::Result<T, PaxError>;
