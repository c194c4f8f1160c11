//! Time-range conversion
//!
//! Parses the two timestamp layouts the platform hands out (fractional and
//! whole-second UTC) into epoch-millisecond pairs.

use chrono::NaiveDateTime;

use crate::error::{GatewayError, GatewayResult};

/// Accepted layouts, tried in order. The fractional form is first; its `%.f`
/// also matches a missing fraction, so each input may use either layout.
pub const ACCEPTED_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%dT%H:%M:%SZ"];

/// Convert a start/end date-string pair to epoch milliseconds.
///
/// `_to_utc` is retained for interface compatibility; both values pin the
/// input to UTC before conversion, so no local-zone shift ever occurs.
pub fn convert_range(start: &str, end: &str, _to_utc: bool) -> GatewayResult<(i64, i64)> {
    let start_ms = parse_timestamp(start)?;
    let end_ms = parse_timestamp(end)?;
    Ok((start_ms, end_ms))
}

fn parse_timestamp(input: &str) -> GatewayResult<i64> {
    for format in ACCEPTED_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(naive.and_utc().timestamp_millis());
        }
    }
    Err(GatewayError::InvalidTimeFormat {
        accepted: ACCEPTED_FORMATS.iter().map(|f| f.to_string()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fractional_and_whole_second_pair() {
        let (start, end) =
            convert_range("2024-01-01T00:00:00.000Z", "2024-01-01T00:00:01Z", true).unwrap();
        assert_eq!(start, 1_704_067_200_000);
        assert_eq!(end, 1_704_067_201_000);
    }

    #[test]
    fn test_flag_does_not_shift() {
        let tagged = convert_range("2024-06-15T12:30:00Z", "2024-06-15T13:30:00Z", true).unwrap();
        let untagged = convert_range("2024-06-15T12:30:00Z", "2024-06-15T13:30:00Z", false).unwrap();
        assert_eq!(tagged, untagged);
    }

    #[test]
    fn test_ordering_preserved() {
        let (start, end) =
            convert_range("2023-04-23T17:25:43.511Z", "2023-04-23T17:25:44.000Z", true).unwrap();
        assert!(start <= end);
    }

    #[test]
    fn test_millisecond_fraction() {
        let (start, _) =
            convert_range("2023-04-23T17:25:43.511Z", "2023-04-23T17:25:44Z", false).unwrap();
        assert_eq!(start % 1000, 511);
    }

    #[test]
    fn test_reparse_own_output_format() {
        let (start, end) =
            convert_range("2024-01-01T00:00:00.250Z", "2024-01-01T06:00:00Z", true).unwrap();
        let restart = chrono::DateTime::from_timestamp_millis(start)
            .unwrap()
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();
        let reend = chrono::DateTime::from_timestamp_millis(end)
            .unwrap()
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();
        assert_eq!(convert_range(&restart, &reend, true).unwrap(), (start, end));
    }

    #[test]
    fn test_rejects_unknown_format() {
        let err = convert_range("2024-01-01 00:00:00", "2024-01-01T00:00:01Z", true).unwrap_err();
        match err {
            GatewayError::InvalidTimeFormat { accepted } => {
                assert_eq!(accepted.len(), 2);
            }
            other => panic!("expected InvalidTimeFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_offset_timezone() {
        assert!(convert_range("2024-01-01T00:00:00+02:00", "2024-01-01T00:00:01Z", true).is_err());
    }
}
