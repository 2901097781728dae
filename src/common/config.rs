/// Size of a page in bytes (4 KB)
pub const PAGE_SIZE: usize = 4096;

/// Invalid page ID constant
pub const INVALID_PAGE_ID: PageId = PageId(u32::MAX);

/// Invalid frame ID constant
pub const INVALID_FRAME_ID: FrameId = FrameId(u32::MAX);

/// Page holding the serialized relation schema. Never holds records.
pub const SCHEMA_PAGE_ID: PageId = PageId(0);

/// Default buffer pool size (number of frames) per paged file
pub const DEFAULT_BUFFER_POOL_SIZE: usize = 32;

/// Magic number at the start of every paged file ("PAXF")
pub const FILE_MAGIC: u32 = 0x5041_5846;

/// On-disk format version written into the file header
pub const FILE_VERSION: u32 = 1;

use super::types::{FrameId, PageId};
