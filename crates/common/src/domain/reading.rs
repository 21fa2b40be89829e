use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Field names of a reading entry on the log.
pub const SITE_ID_FIELD: &str = "site_id";
pub const DEVICE_ID_FIELD: &str = "device_id";
pub const POWER_READING_FIELD: &str = "power_reading";
pub const TIMESTAMP_FIELD: &str = "timestamp";
pub const INGESTED_AT_FIELD: &str = "ingested_at";

/// A log entry as delivered to a consumer: the log-assigned ID plus string fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawMessage {
    pub message_id: String,
    pub fields: HashMap<String, String>,
}

impl RawMessage {
    pub fn new(message_id: impl Into<String>, fields: HashMap<String, String>) -> Self {
        Self {
            message_id: message_id.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// A validated, normalized reading ready to be appended to the log.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub site_id: String,
    pub device_id: String,
    pub power_watts: f64,
    pub event_time: String,
    pub ingested_at: String,
}

impl Reading {
    /// Encodes the reading as log entry fields.
    pub fn into_fields(self) -> Vec<(String, String)> {
        vec![
            (SITE_ID_FIELD.to_string(), self.site_id),
            (DEVICE_ID_FIELD.to_string(), self.device_id),
            (POWER_READING_FIELD.to_string(), self.power_watts.to_string()),
            (TIMESTAMP_FIELD.to_string(), self.event_time),
            (INGESTED_AT_FIELD.to_string(), self.ingested_at),
        ]
    }
}

/// The record persisted in a site's ordered index, one per processed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub message_id: String,
    pub site_id: String,
    pub device_id: Option<String>,
    pub power_watts: f64,
    pub event_time: Option<String>,
    pub ingested_at: Option<String>,
}

impl StoredRecord {
    /// Serialized form used as the index member.
    pub fn to_member(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_member(member: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(member)
    }
}

/// Index key holding the time-ordered history of one site.
pub fn site_index_key(site_id: &str) -> String {
    format!("site:{}:readings", site_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_index_key_format() {
        assert_eq!(site_index_key("site-001"), "site:site-001:readings");
    }

    #[test]
    fn test_reading_into_fields_uses_log_field_names() {
        let reading = Reading {
            site_id: "site-001".to_string(),
            device_id: "meter-42".to_string(),
            power_watts: 1500.5,
            event_time: "2024-01-15T10:30:00Z".to_string(),
            ingested_at: "2024-01-15T10:30:00.123456".to_string(),
        };

        let fields: HashMap<String, String> = reading.into_fields().into_iter().collect();

        assert_eq!(fields.len(), 5);
        assert_eq!(fields[SITE_ID_FIELD], "site-001");
        assert_eq!(fields[DEVICE_ID_FIELD], "meter-42");
        assert_eq!(fields[POWER_READING_FIELD], "1500.5");
        assert_eq!(fields[TIMESTAMP_FIELD], "2024-01-15T10:30:00Z");
        assert_eq!(fields[INGESTED_AT_FIELD], "2024-01-15T10:30:00.123456");
    }

    #[test]
    fn test_stored_record_member_keeps_missing_fields_as_null() {
        let record = StoredRecord {
            message_id: "1705312200000-0".to_string(),
            site_id: "site-001".to_string(),
            device_id: None,
            power_watts: 0.0,
            event_time: None,
            ingested_at: None,
        };

        let member = record.to_member().unwrap();
        let json: serde_json::Value = serde_json::from_str(&member).unwrap();

        assert!(json["device_id"].is_null());
        assert!(json["event_time"].is_null());
        assert_eq!(StoredRecord::from_member(&member).unwrap(), record);
    }
}
