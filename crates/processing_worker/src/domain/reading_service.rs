use common::domain::{
    site_index_key, DomainError, DomainResult, RawMessage, SiteIndexStore, StoredRecord,
    DEVICE_ID_FIELD, INGESTED_AT_FIELD, POWER_READING_FIELD, SITE_ID_FIELD, TIMESTAMP_FIELD,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::timestamp_to_score;

/// What processing did with a message. Both outcomes are safe to acknowledge.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    Stored { key: String, score: f64 },
    Skipped { reason: String },
}

/// Turns raw log messages into [`StoredRecord`]s in the per-site index.
pub struct ReadingService {
    store: Arc<dyn SiteIndexStore>,
}

impl ReadingService {
    pub fn new(store: Arc<dyn SiteIndexStore>) -> Self {
        Self { store }
    }

    /// Store one message in its site's index.
    ///
    /// A message without a site cannot be stored anywhere and is skipped.
    /// Store and serialization failures are returned so the message stays
    /// pending.
    #[instrument(skip(self, message), fields(message_id = %message.message_id))]
    pub async fn process(&self, message: &RawMessage) -> DomainResult<ProcessOutcome> {
        debug!(fields = ?message.fields, "processing reading");

        let site_id = match site_id_of(message) {
            Ok(site_id) => site_id,
            Err(DomainError::MalformedMessage { reason, .. }) => {
                warn!(reason = %reason, "skipping reading");
                return Ok(ProcessOutcome::Skipped { reason });
            }
            Err(e) => return Err(e),
        };

        let record = StoredRecord {
            message_id: message.message_id.clone(),
            site_id: site_id.to_string(),
            device_id: message.field(DEVICE_ID_FIELD).map(str::to_string),
            power_watts: power_watts_of(message),
            event_time: message.field(TIMESTAMP_FIELD).map(str::to_string),
            ingested_at: message.field(INGESTED_AT_FIELD).map(str::to_string),
        };

        let key = site_index_key(site_id);
        let score = timestamp_to_score(message.field(TIMESTAMP_FIELD).unwrap_or_default());
        let member = record.to_member()?;

        self.store.append(&key, &member, score).await?;

        info!(site_id = %site_id, key = %key, score, "stored reading");
        Ok(ProcessOutcome::Stored { key, score })
    }
}

fn site_id_of(message: &RawMessage) -> DomainResult<&str> {
    match message.field(SITE_ID_FIELD) {
        Some(site_id) if !site_id.is_empty() => Ok(site_id),
        _ => Err(DomainError::MalformedMessage {
            message_id: message.message_id.clone(),
            reason: "missing site_id".to_string(),
        }),
    }
}

/// Missing, unparseable or non-finite readings count as 0 W.
fn power_watts_of(message: &RawMessage) -> f64 {
    message
        .field(POWER_READING_FIELD)
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|watts| watts.is_finite())
        .unwrap_or(0.0)
}
