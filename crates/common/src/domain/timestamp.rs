use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parses an ISO-8601 timestamp into UTC.
///
/// A trailing `Z` is read as `+00:00`. Date-times without an offset and bare
/// dates are taken to be UTC. Returns `None` for anything unparseable.
pub fn parse_iso8601(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let normalized = match value.strip_suffix('Z').or_else(|| value.strip_suffix('z')) {
        Some(rest) => format!("{}+00:00", rest),
        None => value.to_string(),
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(&normalized, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zulu_and_explicit_offset_agree() {
        let zulu = parse_iso8601("2024-01-15T10:30:00Z").unwrap();
        let offset = parse_iso8601("2024-01-15T10:30:00+00:00").unwrap();
        assert_eq!(zulu, offset);
        assert_eq!(zulu.timestamp(), 1_705_314_600);
    }

    #[test]
    fn test_non_utc_offset_is_converted() {
        let parsed = parse_iso8601("2024-01-15T12:30:00+02:00").unwrap();
        assert_eq!(parsed, parse_iso8601("2024-01-15T10:30:00Z").unwrap());
    }

    #[test]
    fn test_naive_datetime_is_utc() {
        let parsed = parse_iso8601("2024-01-15T10:30:00.123456").unwrap();
        assert_eq!(parsed.timestamp(), 1_705_314_600);
        assert_eq!(parsed.timestamp_subsec_micros(), 123_456);

        let spaced = parse_iso8601("2024-01-15 10:30:00").unwrap();
        assert_eq!(spaced.timestamp(), 1_705_314_600);
    }

    #[test]
    fn test_date_only_is_midnight_utc() {
        let parsed = parse_iso8601("2024-01-15").unwrap();
        assert_eq!(parsed.timestamp(), 1_705_276_800);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(parse_iso8601("").is_none());
        assert!(parse_iso8601("   ").is_none());
        assert!(parse_iso8601("not-a-timestamp").is_none());
        assert!(parse_iso8601("2024-13-45T99:99:99Z").is_none());
    }
}
