pub mod domain;
pub mod http;
pub mod processing_worker;
pub mod stream;

pub use domain::*;
pub use http::*;
pub use processing_worker::*;
pub use stream::*;
