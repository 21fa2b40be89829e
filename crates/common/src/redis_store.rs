mod client;
mod error;
mod reading_log;
mod site_index;

pub use client::*;
pub use reading_log::*;
pub use site_index::*;
