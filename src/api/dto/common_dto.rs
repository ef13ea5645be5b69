//! Shared DTO helpers used across multiple endpoints.

use chrono::{DateTime, Utc};

use crate::error::GatewayError;

/// Parses an RFC 3339 timestamp taken from a query string.
///
/// An unescaped `+` in a query string decodes to a space, so a single
/// space in the offset position is read back as `+`.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] if the value is not RFC 3339.
pub fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, GatewayError> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(&raw.replace(' ', "+")))
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| GatewayError::InvalidRequest(format!("{field} must be an RFC 3339 timestamp")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_utc_and_offsets() {
        assert!(parse_timestamp("before", "2026-01-02T03:04:05Z").is_ok());
        assert!(parse_timestamp("before", "2026-01-02T03:04:05.123+02:00").is_ok());
        assert!(parse_timestamp("before", "2026-01-02T03:04:05 02:00").is_ok());
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_timestamp("before", "yesterday"),
            Err(GatewayError::InvalidRequest(_))
        ));
    }
}
