mod consume_types;
mod reading_consumer_service;
mod stream_consumer;

pub use consume_types::*;
pub use reading_consumer_service::*;
pub use stream_consumer::*;
