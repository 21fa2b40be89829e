mod handlers;

pub use handlers::*;

use axum::routing::get;
use axum::Router;
use std::sync::Arc;

use crate::domain::{MetricsService, SiteHistoryService};

/// Shared state for the processing-side read API.
#[derive(Clone)]
pub struct ProcessingApiState {
    pub history: Arc<SiteHistoryService>,
    pub metrics: Arc<MetricsService>,
    pub consumer_name: String,
    pub consumer_group: String,
}

/// `GET /health`, `GET /sites/{site_id}/readings` and `GET /metrics`.
pub fn build_router(state: ProcessingApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/sites/{site_id}/readings", get(handlers::site_readings))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
}
