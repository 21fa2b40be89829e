//! Ingestion handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::http::{domain_error_to_response, ErrorBody};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::IngestionApiState;
use crate::domain::ReadingRequest;

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadingAccepted {
    pub status: String,
    pub stream_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestionHealth {
    pub status: String,
    pub redis_connected: bool,
}

/// POST /readings
pub async fn ingest_reading(
    State(state): State<IngestionApiState>,
    body: Result<Json<ReadingRequest>, JsonRejection>,
) -> Response {
    // Malformed JSON and schema mismatches are both client validation errors.
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "rejected reading body");
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorBody::new(rejection.body_text())),
            )
                .into_response();
        }
    };

    match state.service.ingest(request).await {
        Ok(stream_id) => {
            info!(stream_id = %stream_id, "reading accepted");
            (
                StatusCode::CREATED,
                Json(ReadingAccepted {
                    status: "accepted".to_string(),
                    stream_id,
                }),
            )
                .into_response()
        }
        Err(e) => {
            warn!(error = %e, "failed to ingest reading");
            domain_error_to_response(&e)
        }
    }
}

/// GET /health
pub async fn health(State(state): State<IngestionApiState>) -> Json<IngestionHealth> {
    let redis_connected = state.service.log_connected().await;

    Json(IngestionHealth {
        status: (if redis_connected { "healthy" } else { "degraded" }).to_string(),
        redis_connected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IngestionService;
    use crate::http::build_router;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use common::domain::{DomainError, MockReadingLog};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router(mock_log: MockReadingLog) -> axum::Router {
        build_router(Arc::new(IngestionService::new(
            Arc::new(mock_log),
            "energy_readings",
        )))
    }

    fn post_readings(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/readings")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const VALID_BODY: &str = r#"{"site_id":"site-001","device_id":"meter-42","power_reading":1500.5,"timestamp":"2024-01-15T10:30:00Z"}"#;

    #[tokio::test]
    async fn test_valid_reading_returns_201_with_stream_id() {
        let mut mock_log = MockReadingLog::new();
        mock_log
            .expect_append()
            .times(1)
            .return_once(|_, _| Ok("1705314600000-0".to_string()));

        let response = router(mock_log)
            .oneshot(post_readings(VALID_BODY))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["status"], "accepted");
        assert_eq!(body["stream_id"], "1705314600000-0");
    }

    #[tokio::test]
    async fn test_numeric_string_power_is_accepted() {
        let mut mock_log = MockReadingLog::new();
        mock_log
            .expect_append()
            .withf(|_, fields: &Vec<(String, String)>| {
                fields
                    .iter()
                    .any(|(name, value)| name == "power_reading" && value == "1500.5")
            })
            .times(1)
            .return_once(|_, _| Ok("1705314600000-0".to_string()));

        let body = r#"{"site_id":"site-001","device_id":"meter-42","power_reading":"1500.5","timestamp":"2024-01-15T10:30:00Z"}"#;
        let response = router(mock_log).oneshot(post_readings(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_negative_power_returns_422() {
        let mut mock_log = MockReadingLog::new();
        mock_log.expect_append().times(0);

        let body = r#"{"site_id":"site-001","device_id":"meter-42","power_reading":-1,"timestamp":"2024-01-15T10:30:00Z"}"#;
        let response = router(mock_log).oneshot(post_readings(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_missing_field_returns_422() {
        let mut mock_log = MockReadingLog::new();
        mock_log.expect_append().times(0);

        let body = r#"{"site_id":"site-001","power_reading":1,"timestamp":"2024-01-15T10:30:00Z"}"#;
        let response = router(mock_log).oneshot(post_readings(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_malformed_json_returns_422() {
        let mut mock_log = MockReadingLog::new();
        mock_log.expect_append().times(0);

        let response = router(mock_log)
            .oneshot(post_readings("{not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_unreachable_log_returns_503() {
        let mut mock_log = MockReadingLog::new();
        mock_log
            .expect_append()
            .times(1)
            .return_once(|_, _| Err(DomainError::Unavailable("connection refused".to_string())));

        let response = router(mock_log)
            .oneshot(post_readings(VALID_BODY))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_other_log_failure_returns_500() {
        let mut mock_log = MockReadingLog::new();
        mock_log.expect_append().times(1).return_once(|_, _| {
            Err(DomainError::RepositoryError(anyhow::anyhow!(
                "WRONGTYPE Operation against a key holding the wrong kind of value"
            )))
        });

        let response = router(mock_log)
            .oneshot(post_readings(VALID_BODY))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_health_reports_connectivity() {
        let mut mock_log = MockReadingLog::new();
        mock_log.expect_ping().times(1).return_once(|| Ok(()));

        let response = router(mock_log)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["redis_connected"], true);
    }

    #[tokio::test]
    async fn test_health_degraded_when_log_down() {
        let mut mock_log = MockReadingLog::new();
        mock_log
            .expect_ping()
            .times(1)
            .return_once(|| Err(DomainError::Unavailable("down".to_string())));

        let response = router(mock_log)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "degraded");
    }
}
