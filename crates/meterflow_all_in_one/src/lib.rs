pub mod app;
pub mod config;

pub use crate::app::*;
pub use crate::config::*;
