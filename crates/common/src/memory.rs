mod in_memory_reading_log;
mod in_memory_site_index;

pub use in_memory_reading_log::*;
pub use in_memory_site_index::*;
