pub mod domain;
pub mod http;
pub mod memory;
pub mod redis_store;
pub mod telemetry;

pub use domain::*;
pub use http::*;
pub use memory::*;
pub use redis_store::*;
pub use telemetry::*;

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use domain::MockReadingLog;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockSiteIndexStore;
