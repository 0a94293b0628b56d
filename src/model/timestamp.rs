use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch, the single time representation handed to views.
pub type EpochMillis = i64;

pub fn now() -> EpochMillis {
    Utc::now().timestamp_millis()
}

/// A timestamp as it may be found in the store.
///
/// Documents written by this application carry integer milliseconds, but older documents may hold floats, numeric
/// strings, RFC 3339 strings or native datetimes (which arrive as RFC 3339 text).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredTime {
    Millis(i64),
    Fractional(f64),
    Text(String),
}

impl StoredTime {
    pub fn to_millis(&self) -> Option<EpochMillis> {
        match self {
            StoredTime::Millis(millis) => Some(*millis),
            StoredTime::Fractional(millis) if millis.is_finite() => Some(millis.round() as i64),
            StoredTime::Fractional(_) => None,
            StoredTime::Text(text) => text.trim().parse::<i64>().ok().or_else(|| {
                DateTime::parse_from_rfc3339(text.trim())
                    .ok()
                    .map(|datetime| datetime.timestamp_millis())
            }),
        }
    }
}

impl From<EpochMillis> for StoredTime {
    fn from(millis: EpochMillis) -> Self {
        StoredTime::Millis(millis)
    }
}

/// Normalizes an optional stored timestamp, substituting `fallback` when it is absent or unreadable.
///
/// Readers pass the current time as the fallback, so a document without a creation time reports a different one on
/// every read.
pub fn normalize_or(stored: Option<&StoredTime>, fallback: EpochMillis) -> EpochMillis {
    normalize(stored).unwrap_or(fallback)
}

pub fn normalize(stored: Option<&StoredTime>) -> Option<EpochMillis> {
    stored.and_then(StoredTime::to_millis)
}

/// Parses a `YYYY-MM-DD` form date as midnight UTC.
pub fn parse_date(text: &str) -> Option<EpochMillis> {
    let date = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(midnight.and_utc().timestamp_millis())
}

/// Formats a timestamp the way pages show dates, e.g. `March 1, 2024`.
pub fn display_date(millis: EpochMillis) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|datetime| datetime.format("%B %-d, %Y").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_millis_pass_through() {
        let stored = StoredTime::Millis(1_700_000_000_000);
        assert_eq!(normalize_or(Some(&stored), 0), 1_700_000_000_000);
    }

    #[test]
    fn native_datetimes_become_millis() {
        let stored: StoredTime = serde_json::from_str("\"2024-03-01T12:00:00Z\"").unwrap();
        assert_eq!(normalize(Some(&stored)), Some(1_709_294_400_000));
    }

    #[test]
    fn fractional_and_numeric_text_are_accepted() {
        let fractional: StoredTime = serde_json::from_str("1700000000000.4").unwrap();
        assert_eq!(normalize(Some(&fractional)), Some(1_700_000_000_000));

        let text = StoredTime::Text("1700000000000".into());
        assert_eq!(normalize(Some(&text)), Some(1_700_000_000_000));
    }

    #[test]
    fn missing_time_falls_back() {
        assert_eq!(normalize_or(None, 42), 42);
        assert_eq!(
            normalize_or(Some(&StoredTime::Text("yesterday".into())), 42),
            42
        );
    }

    #[test]
    fn form_dates_are_midnight_utc() {
        assert_eq!(parse_date("2024-03-01"), Some(1_709_251_200_000));
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("03/01/2024"), None);
    }

    #[test]
    fn dates_are_displayed_in_long_form() {
        assert_eq!(display_date(1_709_294_400_000), "March 1, 2024");
    }
}
