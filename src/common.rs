//! Date handling shared by the models, the filters and the CLI
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::LedgerError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Reads a backend timestamp in any of the shapes the feeds use: RFC 3339,
/// a naive `YYYY-MM-DDTHH:MM:SS`, or a bare calendar date. Anything else is
/// treated as absent.
pub fn parse_timestamp_lenient(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// `deserialize_with` target for optional timestamps; malformed input is `None`.
pub fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().and_then(parse_timestamp_lenient))
}

/// Strict `YYYY-MM-DD` parsing for user-supplied filter bounds.
pub fn parse_date(raw: &str) -> Result<NaiveDate, LedgerError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|e| LedgerError::InvalidInput(format!("Invalid date '{}': {}", raw, e)))
}

/// Inclusive calendar-day range; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    /// Builds a range from optional `YYYY-MM-DD` strings. Empty strings mean
    /// "no bound", matching an untouched date input.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self, LedgerError> {
        let bound = |raw: Option<&str>| -> Result<Option<NaiveDate>, LedgerError> {
            match raw.map(str::trim) {
                None | Some("") => Ok(None),
                Some(value) => parse_date(value).map(Some),
            }
        };
        Ok(Self::new(bound(from)?, bound(to)?))
    }

    /// True when neither bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }

    /// Evaluates the range against an optional record date. An unbounded range
    /// accepts everything; a bounded range rejects a missing date.
    pub fn admits(&self, date: Option<NaiveDate>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        date.is_some_and(|d| self.contains(d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn parses_backend_timestamp_shapes() {
        let expected = day("2024-03-05");
        for raw in [
            "2024-03-05T10:15:00.000Z",
            "2024-03-05T10:15:00+05:30",
            "2024-03-05T10:15:00",
            "2024-03-05 10:15:00",
            "2024-03-05",
        ] {
            let parsed = parse_timestamp_lenient(raw).expect(raw);
            assert_eq!(parsed.date_naive(), expected, "{}", raw);
        }
        assert!(parse_timestamp_lenient("Invalid Date").is_none());
        assert!(parse_timestamp_lenient("").is_none());
    }

    #[test]
    fn range_is_inclusive_on_both_ends() {
        let range = DateRange::new(Some(day("2024-01-01")), Some(day("2024-01-31")));
        assert!(range.contains(day("2024-01-01")));
        assert!(range.contains(day("2024-01-31")));
        assert!(!range.contains(day("2023-12-31")));
        assert!(!range.contains(day("2024-02-01")));
    }

    #[test]
    fn open_ends_are_unbounded() {
        let from_only = DateRange::new(Some(day("2024-01-10")), None);
        assert!(from_only.contains(day("2030-01-01")));
        assert!(!from_only.contains(day("2024-01-09")));

        let to_only = DateRange::new(None, Some(day("2024-01-10")));
        assert!(to_only.contains(day("1999-01-01")));
    }

    #[test]
    fn missing_date_only_fails_a_bounded_range() {
        assert!(DateRange::default().admits(None));
        assert!(!DateRange::new(None, Some(day("2024-01-10"))).admits(None));
    }

    #[test]
    fn parse_treats_empty_as_unbounded_and_rejects_garbage() {
        let range = DateRange::parse(Some(""), None).unwrap();
        assert!(range.is_unbounded());

        let err = DateRange::parse(Some("05/03/2024"), None).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }
}
