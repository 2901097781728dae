pub mod disk;
pub mod page;
mod paged_file;

pub use paged_file::PagedFile;
