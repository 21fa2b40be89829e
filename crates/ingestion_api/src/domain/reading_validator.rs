use common::domain::{parse_iso8601, DomainError, DomainResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Body of `POST /readings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingRequest {
    pub site_id: String,
    pub device_id: String,
    /// Watts. Numeric strings such as `"1500.5"` are accepted.
    #[serde(deserialize_with = "de_number_or_numeric_string")]
    pub power_reading: f64,
    /// ISO-8601 event time.
    pub timestamp: String,
}

fn de_number_or_numeric_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("power_reading is out of range")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("power_reading is not a number: '{}'", s))),
        other => Err(serde::de::Error::custom(format!(
            "power_reading must be a number, got {}",
            other
        ))),
    }
}

/// Checks an inbound reading before it is appended to the log.
///
/// Identifiers must be non-empty, power must be a finite, non-negative number
/// and the timestamp must parse as ISO-8601 (a trailing `Z` is accepted).
pub fn validate_reading(request: &ReadingRequest) -> DomainResult<()> {
    if request.site_id.is_empty() {
        return Err(DomainError::InvalidReading(
            "site_id must not be empty".to_string(),
        ));
    }

    if request.device_id.is_empty() {
        return Err(DomainError::InvalidReading(
            "device_id must not be empty".to_string(),
        ));
    }

    if !request.power_reading.is_finite() || request.power_reading < 0.0 {
        return Err(DomainError::InvalidReading(format!(
            "power_reading must be a number >= 0, got {}",
            request.power_reading
        )));
    }

    if parse_iso8601(&request.timestamp).is_none() {
        return Err(DomainError::InvalidReading(format!(
            "timestamp must be in ISO 8601 format, got '{}'",
            request.timestamp
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> ReadingRequest {
        ReadingRequest {
            site_id: "site-001".to_string(),
            device_id: "meter-42".to_string(),
            power_reading: 1500.5,
            timestamp: "2024-01-15T10:30:00Z".to_string(),
        }
    }

    #[test]
    fn test_valid_reading_passes() {
        assert!(validate_reading(&valid_request()).is_ok());
    }

    #[test]
    fn test_zero_power_is_allowed() {
        let request = ReadingRequest {
            power_reading: 0.0,
            ..valid_request()
        };
        assert!(validate_reading(&request).is_ok());
    }

    #[test]
    fn test_offset_and_naive_timestamps_pass() {
        for timestamp in ["2024-01-15T10:30:00+02:00", "2024-01-15T10:30:00.123456"] {
            let request = ReadingRequest {
                timestamp: timestamp.to_string(),
                ..valid_request()
            };
            assert!(validate_reading(&request).is_ok(), "{}", timestamp);
        }
    }

    #[test]
    fn test_empty_site_id_rejected() {
        let request = ReadingRequest {
            site_id: String::new(),
            ..valid_request()
        };

        let result = validate_reading(&request);
        assert!(matches!(result, Err(DomainError::InvalidReading(msg)) if msg.contains("site_id")));
    }

    #[test]
    fn test_empty_device_id_rejected() {
        let request = ReadingRequest {
            device_id: String::new(),
            ..valid_request()
        };

        let result = validate_reading(&request);
        assert!(matches!(result, Err(DomainError::InvalidReading(msg)) if msg.contains("device_id")));
    }

    #[test]
    fn test_negative_power_rejected() {
        let request = ReadingRequest {
            power_reading: -1.0,
            ..valid_request()
        };

        assert!(matches!(
            validate_reading(&request),
            Err(DomainError::InvalidReading(_))
        ));
    }

    #[test]
    fn test_numeric_string_power_is_coerced() {
        let request: ReadingRequest = serde_json::from_str(
            r#"{"site_id":"site-001","device_id":"meter-42","power_reading":"1500.5","timestamp":"2024-01-15T10:30:00Z"}"#,
        )
        .unwrap();

        assert_eq!(request.power_reading, 1500.5);
        assert!(validate_reading(&request).is_ok());
    }

    #[test]
    fn test_non_numeric_power_fails_to_deserialize() {
        for power in [r#""lots""#, "true", "null"] {
            let body = format!(
                r#"{{"site_id":"site-001","device_id":"meter-42","power_reading":{},"timestamp":"2024-01-15T10:30:00Z"}}"#,
                power
            );
            assert!(serde_json::from_str::<ReadingRequest>(&body).is_err(), "{}", power);
        }
    }

    #[test]
    fn test_non_iso_timestamp_rejected() {
        let request = ReadingRequest {
            timestamp: "15/01/2024 10:30".to_string(),
            ..valid_request()
        };

        let result = validate_reading(&request);
        assert!(matches!(result, Err(DomainError::InvalidReading(msg)) if msg.contains("ISO 8601")));
    }
}
