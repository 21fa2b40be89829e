mod reading;
mod reading_log;
mod result;
mod site_index;
mod timestamp;

pub use reading::*;
pub use reading_log::*;
pub use result::*;
pub use site_index::*;
pub use timestamp::*;
