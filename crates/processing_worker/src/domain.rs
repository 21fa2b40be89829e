mod metrics_service;
mod reading_service;
mod site_history_service;
mod timestamp_score;

pub use metrics_service::*;
pub use reading_service::*;
pub use site_history_service::*;
pub use timestamp_score::*;
