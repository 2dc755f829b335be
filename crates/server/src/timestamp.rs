//! Parsing of caller-supplied transaction timestamps.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::ServerError;

/// Parse an optional timestamp string into UTC.
///
/// Accepted forms, tried in order:
/// - RFC 3339 with an explicit offset (`2026-01-15T10:30:00+05:30`)
/// - a naive timestamp (`2026-01-15T10:30:00` or without seconds),
///   interpreted in the configured default input timezone
///
/// `None` falls back to `now`.
pub fn parse_transaction_date_time(
    raw: Option<&str>,
    default_tz: Tz,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ServerError> {
    let Some(raw) = raw else {
        return Ok(now);
    };
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .map_err(|_| {
            ServerError::Generic(format!("invalid transaction_date_time: {raw}"))
        })?;

    // DST gaps and folds resolve to the earlier valid instant.
    default_tz
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| ServerError::Generic(format!("invalid transaction_date_time: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Kolkata;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn absent_defaults_to_now() {
        let parsed = parse_transaction_date_time(None, Kolkata, now()).unwrap();
        assert_eq!(parsed, now());
    }

    #[test]
    fn rfc3339_offset_is_honored() {
        let parsed =
            parse_transaction_date_time(Some("2026-01-15T10:30:00+05:30"), Kolkata, now()).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 1, 15, 5, 0, 0).unwrap());
    }

    #[test]
    fn naive_is_interpreted_in_default_timezone() {
        let parsed =
            parse_transaction_date_time(Some("2026-01-15T10:30:00"), Kolkata, now()).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 1, 15, 5, 0, 0).unwrap());
    }

    #[test]
    fn naive_without_seconds_parses() {
        let parsed = parse_transaction_date_time(Some("2026-01-15T10:30"), Kolkata, now()).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 1, 15, 5, 0, 0).unwrap());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_transaction_date_time(Some("next tuesday"), Kolkata, now()).is_err());
    }
}
