use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::value::Value;

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parse a timestamp or calendar date.
///
/// Timestamps with an explicit offset keep their wall-clock time (the offset is dropped),
/// so the calendar date is the one written in the input.
pub fn parse_date_time(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }
    None
}

/// Coerce a cell to a calendar date, ignoring time-of-day.
///
/// Numbers are read as Unix epoch milliseconds. Anything that cannot be read as a date
/// yields `None`; callers treat that as "does not match" rather than as an error.
pub fn coerce_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::DateTime(dt) => Some(dt.date()),
        Value::String(s) => parse_date_time(s).map(|dt| dt.date()),
        Value::Number(n) if n.is_finite() => {
            DateTime::from_timestamp_millis(*n as i64).map(|dt| dt.naive_utc().date())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_common_layouts() {
        assert_eq!(
            parse_date_time("2023-01-03").map(|dt| dt.date()),
            Some(ymd(2023, 1, 3))
        );
        assert_eq!(
            parse_date_time("2023-01-03 17:45:00").map(|dt| dt.date()),
            Some(ymd(2023, 1, 3))
        );
        assert_eq!(
            parse_date_time("2023-01-03T23:59:59.250").map(|dt| dt.date()),
            Some(ymd(2023, 1, 3))
        );
        assert_eq!(
            parse_date_time("2023-01-03T23:30:00-05:00").map(|dt| dt.date()),
            Some(ymd(2023, 1, 3))
        );
        assert_eq!(parse_date_time("not a date"), None);
        assert_eq!(parse_date_time("   "), None);
    }

    #[test]
    fn coerce_date_drops_time_of_day() {
        let value = Value::DateTime(ymd(2023, 1, 3).and_hms_opt(18, 0, 0).unwrap());
        assert_eq!(coerce_date(&value), Some(ymd(2023, 1, 3)));
        assert_eq!(coerce_date(&Value::Boolean(true)), None);
        assert_eq!(coerce_date(&Value::Null), None);
    }

    #[test]
    fn coerce_date_reads_epoch_millis() {
        // 2023-01-03T00:00:00Z
        assert_eq!(
            coerce_date(&Value::Number(1_672_704_000_000.0)),
            Some(ymd(2023, 1, 3))
        );
    }
}
