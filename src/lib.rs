//! paxrm - a record manager for fixed-width relations stored in PAX pages
//!
//! A relation file keeps its schema on page 0 and records on the pages after
//! it. Each record page splits its space into one mini-page per attribute, so
//! the values of one attribute sit next to each other on disk. A shared
//! occupancy bitmap at the front of the page tracks which slots are live.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Storage Layer** (`storage`): Disk I/O and page formats
//!   - `DiskManager`: Reads and writes pages and owns the page-allocation map
//!   - `DiskScheduler`: Background worker that performs page I/O
//!   - `PagedFile`: Numbered pages of one file behind a private buffer pool
//!   - `PageLayout`/`RecordPage`: PAX record page geometry and access
//!
//! - **Buffer Pool** (`buffer`): Memory management for pages
//!   - `BufferPoolManager`: Caches pages in memory and writes dirty ones back
//!   - `LruReplacer`: Least-recently-used eviction
//!   - `ReadPageGuard`/`WritePageGuard`: RAII guards that unpin on drop
//!
//! - **Record Layer** (`record`): Relations and records
//!   - `RecordFileManager`: Creates, opens and destroys relation files
//!   - `RecordFile`: Insert, delete, update, lookup and ordered traversal
//!   - `RecordFileScan`: Forward cursor with attribute projection
//!
//! # Example
//!
//! ```rust,no_run
//! use paxrm::record::{AttrInfo, AttrType, RecordFileManager};
//!
//! let manager = RecordFileManager::new();
//! let attrs = vec![
//!     AttrInfo::new("emp", "id", AttrType::Integer, 4),
//!     AttrInfo::new("emp", "salary", AttrType::Double, 8),
//! ];
//! let mut file = manager.create_file("emp.rel", &attrs).unwrap();
//!
//! let mut row = 7i32.to_be_bytes().to_vec();
//! row.extend_from_slice(&5200.0f64.to_be_bytes());
//! let rid = file.insert_record(&row).unwrap();
//!
//! let record = file.get_record(rid).unwrap().unwrap();
//! assert_eq!(record.data(), &row[..]);
//!
//! let mut scan = manager.create_scan();
//! scan.open_scan(&file, &attrs[1..]).unwrap();
//! while let Some(record) = scan.get_next_record().unwrap() {
//!     println!("{}: {:?}", record.rid(), record.data());
//! }
//! scan.close_scan();
//! drop(scan);
//!
//! file.close().unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod record;
pub mod storage;

// Re-export commonly used types at the crate root
pub use common::{PageId, PaxError, Result, Rid, SlotId};
pub use record::{AttrInfo, AttrType, Record, RecordFile, RecordFileManager, RecordFileScan};
