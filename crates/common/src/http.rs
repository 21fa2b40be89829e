mod error;
mod server;

pub use error::*;
pub use server::*;
