mod file_header_page;
mod record_page;

pub use file_header_page::*;
pub use record_page::*;
