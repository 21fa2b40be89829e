use common::domain::parse_iso8601;

/// Sort score for an event timestamp: seconds since the Unix epoch (UTC),
/// fractional part included. Anything that is not ISO-8601 scores `0.0`.
pub fn timestamp_to_score(timestamp: &str) -> f64 {
    parse_iso8601(timestamp)
        .map(|parsed| parsed.timestamp_micros() as f64 / 1_000_000.0)
        .unwrap_or(0.0)
}
