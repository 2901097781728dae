mod attribute;
mod file_manager;
#[allow(clippy::module_inception)]
mod record;
mod record_file;
mod scan;
mod schema_block;

pub use attribute::*;
pub use file_manager::*;
pub use record::*;
pub use record_file::RecordFile;
pub use scan::*;
pub use schema_block::*;
