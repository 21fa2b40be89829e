mod handlers;

pub use handlers::*;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::domain::IngestionService;

/// Shared state for ingestion handlers.
#[derive(Clone)]
pub struct IngestionApiState {
    pub service: Arc<IngestionService>,
}

/// `POST /readings` and `GET /health`.
pub fn build_router(service: Arc<IngestionService>) -> Router {
    Router::new()
        .route("/readings", post(handlers::ingest_reading))
        .route("/health", get(handlers::health))
        .with_state(IngestionApiState { service })
}
