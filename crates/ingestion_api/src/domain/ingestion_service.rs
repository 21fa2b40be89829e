use chrono::Utc;
use common::domain::{DomainResult, Reading, ReadingLog};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::{validate_reading, ReadingRequest};

/// Naive UTC with microseconds, e.g. `2024-01-15T10:30:00.123456`.
const INGESTED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Validates readings and appends them to the log (the producer side).
pub struct IngestionService {
    log: Arc<dyn ReadingLog>,
    stream: String,
}

impl IngestionService {
    pub fn new(log: Arc<dyn ReadingLog>, stream: impl Into<String>) -> Self {
        Self {
            log,
            stream: stream.into(),
        }
    }

    /// Validate, stamp with the ingestion time and append. Returns the
    /// log-assigned message ID.
    #[instrument(skip(self, request), fields(site_id = %request.site_id, device_id = %request.device_id))]
    pub async fn ingest(&self, request: ReadingRequest) -> DomainResult<String> {
        validate_reading(&request)?;

        let reading = Reading {
            site_id: request.site_id,
            device_id: request.device_id,
            power_watts: request.power_reading,
            event_time: request.timestamp,
            ingested_at: Utc::now().format(INGESTED_AT_FORMAT).to_string(),
        };

        let message_id = self.log.append(&self.stream, reading.into_fields()).await?;
        debug!(stream = %self.stream, message_id = %message_id, "reading appended");
        Ok(message_id)
    }

    /// Whether the log answers a ping.
    pub async fn log_connected(&self) -> bool {
        match self.log.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "reading log ping failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::domain::{
        parse_iso8601, DomainError, MockReadingLog, INGESTED_AT_FIELD, POWER_READING_FIELD,
        SITE_ID_FIELD, TIMESTAMP_FIELD,
    };
    use std::collections::HashMap;

    fn request() -> ReadingRequest {
        ReadingRequest {
            site_id: "site-001".to_string(),
            device_id: "meter-42".to_string(),
            power_reading: 1500.5,
            timestamp: "2024-01-15T10:30:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_ingest_appends_fields_and_returns_id() {
        let mut mock_log = MockReadingLog::new();
        mock_log
            .expect_append()
            .withf(|stream: &str, fields: &Vec<(String, String)>| {
                let fields: HashMap<&str, &str> = fields
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();
                stream == "energy_readings"
                    && fields[SITE_ID_FIELD] == "site-001"
                    && fields[POWER_READING_FIELD] == "1500.5"
                    && fields[TIMESTAMP_FIELD] == "2024-01-15T10:30:00Z"
                    && parse_iso8601(fields[INGESTED_AT_FIELD]).is_some()
            })
            .times(1)
            .return_once(|_, _| Ok("1705314600000-0".to_string()));

        let service = IngestionService::new(Arc::new(mock_log), "energy_readings");
        let message_id = service.ingest(request()).await.unwrap();

        assert_eq!(message_id, "1705314600000-0");
    }

    #[tokio::test]
    async fn test_invalid_reading_never_reaches_log() {
        let mut mock_log = MockReadingLog::new();
        mock_log.expect_append().times(0);

        let service = IngestionService::new(Arc::new(mock_log), "energy_readings");
        let result = service
            .ingest(ReadingRequest {
                power_reading: -5.0,
                ..request()
            })
            .await;

        assert!(matches!(result, Err(DomainError::InvalidReading(_))));
    }

    #[tokio::test]
    async fn test_unavailable_log_is_propagated() {
        let mut mock_log = MockReadingLog::new();
        mock_log
            .expect_append()
            .times(1)
            .return_once(|_, _| Err(DomainError::Unavailable("connection refused".to_string())));

        let service = IngestionService::new(Arc::new(mock_log), "energy_readings");
        let result = service.ingest(request()).await;

        assert!(matches!(result, Err(DomainError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_log_connected_reflects_ping() {
        let mut mock_log = MockReadingLog::new();
        mock_log
            .expect_ping()
            .times(1)
            .return_once(|| Err(DomainError::Unavailable("down".to_string())));

        let service = IngestionService::new(Arc::new(mock_log), "energy_readings");
        assert!(!service.log_connected().await);
    }
}
