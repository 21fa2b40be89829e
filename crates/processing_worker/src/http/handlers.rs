//! Read API handlers.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::domain::StoredRecord;
use common::http::domain_error_to_response;
use serde::Serialize;
use tracing::warn;

use super::ProcessingApiState;

#[derive(Debug, Serialize)]
pub struct ProcessingHealth {
    pub status: String,
    pub redis_connected: bool,
    pub consumer_name: String,
    pub consumer_group: String,
}

#[derive(Debug, Serialize)]
pub struct SiteReadings {
    pub site_id: String,
    pub readings: Vec<StoredRecord>,
}

/// GET /health
pub async fn health(State(state): State<ProcessingApiState>) -> Json<ProcessingHealth> {
    let redis_connected =
        state.metrics.log_connected().await && state.history.store_connected().await;

    Json(ProcessingHealth {
        status: (if redis_connected { "healthy" } else { "degraded" }).to_string(),
        redis_connected,
        consumer_name: state.consumer_name.clone(),
        consumer_group: state.consumer_group.clone(),
    })
}

/// GET /sites/{site_id}/readings
pub async fn site_readings(
    State(state): State<ProcessingApiState>,
    Path(site_id): Path<String>,
) -> Response {
    match state.history.site_readings(&site_id).await {
        Ok(readings) => Json(SiteReadings { site_id, readings }).into_response(),
        Err(e) => {
            warn!(site_id = %site_id, error = %e, "failed to read site history");
            domain_error_to_response(&e)
        }
    }
}

/// GET /metrics
pub async fn metrics(State(state): State<ProcessingApiState>) -> Response {
    match state.metrics.snapshot().await {
        Ok(metrics) => Json(metrics).into_response(),
        Err(e) => {
            warn!(error = %e, "failed to collect metrics");
            domain_error_to_response(&e)
        }
    }
}
