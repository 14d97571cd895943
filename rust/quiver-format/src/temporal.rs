//! Text conversion of date, time, timestamp and duration values.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use quiver_common::{Result, error::Error};

use crate::datatype::{DataType, TimeUnit};

const SECONDS_PER_DAY: i64 = 86_400;

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

/// `YYYY-MM-DD` for days since the epoch.
pub fn format_date32(days: i32) -> String {
    match epoch().checked_add_signed(Duration::days(days as i64)) {
        Some(d) => d.format("%Y-%m-%d").to_string(),
        None => days.to_string(),
    }
}

/// `YYYY-MM-DD` for milliseconds since the epoch.
pub fn format_date64(millis: i64) -> String {
    format_date32(millis.div_euclid(SECONDS_PER_DAY * 1_000) as i32)
}

fn split_units(value: i64, unit: TimeUnit) -> (i64, u32) {
    let per_sec = unit.multiplier();
    let secs = value.div_euclid(per_sec);
    let nanos = value.rem_euclid(per_sec) * (1_000_000_000 / per_sec);
    (secs, nanos as u32)
}

fn fraction_format(unit: TimeUnit) -> &'static str {
    match unit {
        TimeUnit::Second => "",
        TimeUnit::Millisecond => "%.3f",
        TimeUnit::Microsecond => "%.6f",
        TimeUnit::Nanosecond => "%.9f",
    }
}

/// `HH:MM:SS[.fff]` for a time of day in `unit`.
pub fn format_time(value: i64, unit: TimeUnit) -> String {
    let (secs, nanos) = split_units(value, unit);
    match NaiveTime::from_num_seconds_from_midnight_opt(secs as u32, nanos) {
        Some(t) if (0..SECONDS_PER_DAY).contains(&secs) => t
            .format(&format!("%H:%M:%S{}", fraction_format(unit)))
            .to_string(),
        _ => value.to_string(),
    }
}

/// `YYYY-MM-DD HH:MM:SS[.fff]` for an instant in `unit`, with a trailing `Z`
/// when the type carries a timezone (values are stored as UTC).
pub fn format_timestamp(value: i64, unit: TimeUnit, tz: Option<&str>) -> String {
    let (secs, nanos) = split_units(value, unit);
    let Some(dt) = DateTime::from_timestamp(secs, nanos) else {
        return value.to_string();
    };
    let mut s = dt
        .naive_utc()
        .format(&format!("%Y-%m-%d %H:%M:%S{}", fraction_format(unit)))
        .to_string();
    if tz.is_some() {
        s.push('Z');
    }
    s
}

/// `<value><unit>`, e.g. `15ms`.
pub fn format_duration(value: i64, unit: TimeUnit) -> String {
    format!("{value}{}", unit.suffix())
}

fn parse_err(s: &str, data_type: &DataType, msg: impl std::fmt::Display) -> Error {
    Error::parse(s, data_type, msg.to_string())
}

fn scale_nanos(secs: i64, nanos: u32, unit: TimeUnit) -> Option<i64> {
    let per_sec = unit.multiplier();
    secs.checked_mul(per_sec)?
        .checked_add(nanos as i64 / (1_000_000_000 / per_sec))
}

/// Parses `YYYY-MM-DD` into days since the epoch.
pub fn parse_date32(s: &str) -> Result<i32> {
    let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| parse_err(s, &DataType::Date32, e))?;
    Ok((date - epoch()).num_days() as i32)
}

/// Parses `YYYY-MM-DD` into milliseconds since the epoch.
pub fn parse_date64(s: &str) -> Result<i64> {
    let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| parse_err(s, &DataType::Date64, e))?;
    Ok((date - epoch()).num_days() * SECONDS_PER_DAY * 1_000)
}

/// Parses `HH:MM:SS[.fff]` into a time of day in `unit`.
pub fn parse_time(s: &str, unit: TimeUnit, data_type: &DataType) -> Result<i64> {
    let t = NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f")
        .map_err(|e| parse_err(s, data_type, e))?;
    scale_nanos(t.num_seconds_from_midnight() as i64, t.nanosecond(), unit)
        .ok_or_else(|| parse_err(s, data_type, "out of range"))
}

/// Parses an instant into `unit` since the epoch.
///
/// Accepts RFC 3339 (`2024-01-02T03:04:05Z`, with any offset), naive
/// `YYYY-MM-DD[ T]HH:MM:SS[.fff]` (interpreted as UTC) and bare dates.
pub fn parse_timestamp(s: &str, unit: TimeUnit, data_type: &DataType) -> Result<i64> {
    let text = s.trim();
    let naive = if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        dt.naive_utc()
    } else if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f") {
        dt
    } else if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        dt
    } else if let Some(dt) = text
        .strip_suffix('Z')
        .and_then(|t| NaiveDateTime::parse_from_str(t, "%Y-%m-%d %H:%M:%S%.f").ok())
    {
        dt
    } else {
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map_err(|e| parse_err(s, data_type, e))?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| parse_err(s, data_type, "invalid date"))?
    };
    let utc = naive.and_utc();
    scale_nanos(utc.timestamp(), utc.timestamp_subsec_nanos(), unit)
        .ok_or_else(|| parse_err(s, data_type, "out of range"))
}

/// Parses a duration: a plain integer count of `unit`, optionally followed
/// by the unit suffix.
pub fn parse_duration(s: &str, unit: TimeUnit, data_type: &DataType) -> Result<i64> {
    let text = s.trim();
    let text = text.strip_suffix(unit.suffix()).unwrap_or(text);
    text.parse::<i64>().map_err(|e| parse_err(s, data_type, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dates() {
        assert_eq!(format_date32(0), "1970-01-01");
        assert_eq!(format_date32(19723), "2024-01-01");
        assert_eq!(format_date32(-1), "1969-12-31");
        assert_eq!(parse_date32("2024-01-01").unwrap(), 19723);
        assert_eq!(format_date64(86_400_000), "1970-01-02");
        assert_eq!(parse_date64("1970-01-02").unwrap(), 86_400_000);
        assert!(parse_date32("2024-13-01").is_err());
    }

    #[test]
    fn test_times() {
        assert_eq!(format_time(3_723, TimeUnit::Second), "01:02:03");
        assert_eq!(format_time(3_723_004, TimeUnit::Millisecond), "01:02:03.004");
        let dt = DataType::Time64(TimeUnit::Microsecond);
        assert_eq!(
            parse_time("01:02:03.5", TimeUnit::Microsecond, &dt).unwrap(),
            3_723_500_000
        );
    }

    #[test]
    fn test_timestamps() {
        assert_eq!(
            format_timestamp(1_000, TimeUnit::Millisecond, None),
            "1970-01-01 00:00:01.000"
        );
        assert_eq!(
            format_timestamp(-1, TimeUnit::Second, Some("UTC")),
            "1969-12-31 23:59:59Z"
        );
        let dt = DataType::Timestamp(TimeUnit::Second, None);
        assert_eq!(
            parse_timestamp("1970-01-01 00:01:00", TimeUnit::Second, &dt).unwrap(),
            60
        );
        assert_eq!(
            parse_timestamp("1970-01-01T01:00:00+01:00", TimeUnit::Second, &dt).unwrap(),
            0
        );
        assert_eq!(
            parse_timestamp("1970-01-02", TimeUnit::Millisecond, &dt).unwrap(),
            86_400_000
        );
        assert!(parse_timestamp("yesterday", TimeUnit::Second, &dt).is_err());
    }

    #[test]
    fn test_durations() {
        let dt = DataType::Duration(TimeUnit::Millisecond);
        assert_eq!(format_duration(15, TimeUnit::Millisecond), "15ms");
        assert_eq!(parse_duration("15ms", TimeUnit::Millisecond, &dt).unwrap(), 15);
        assert_eq!(parse_duration("-3", TimeUnit::Millisecond, &dt).unwrap(), -3);
        assert!(parse_duration("1.5", TimeUnit::Millisecond, &dt).is_err());
    }
}
