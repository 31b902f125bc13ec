//! Time coordinate decoding.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::types::TimeKey;

/// Parse an ISO-8601 date or date-time. Values without an offset are UTC.
pub fn parse_iso_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// A parsed CF `"<unit> since <reference>"` string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CfTimeUnits {
    pub seconds_per_unit: f64,
    pub reference: DateTime<Utc>,
}

impl CfTimeUnits {
    pub fn parse(units: &str) -> Option<Self> {
        let (unit, reference) = units.split_once(" since ")?;
        let seconds_per_unit = match unit.trim().to_lowercase().as_str() {
            "seconds" | "second" | "secs" | "sec" | "s" => 1.0,
            "minutes" | "minute" | "mins" | "min" => 60.0,
            "hours" | "hour" | "hrs" | "hr" | "h" => 3600.0,
            "days" | "day" | "d" => 86400.0,
            _ => return None,
        };
        // CF allows a trailing "UTC" or "Z" on the reference
        let reference = reference.trim().trim_end_matches("UTC").trim();
        Some(Self {
            seconds_per_unit,
            reference: parse_iso_date(reference)?,
        })
    }

    pub fn decode(&self, value: f64) -> Option<DateTime<Utc>> {
        if !value.is_finite() {
            return None;
        }
        let millis = (value * self.seconds_per_unit * 1000.0).round() as i64;
        self.reference.checked_add_signed(Duration::milliseconds(millis))
    }
}

/// Decode time coordinate values into time keys.
///
/// CF units in `attributes` yield dates; otherwise integral values yield
/// integer ids. Returns `None` when the values cannot be decoded.
pub fn decode_time_coordinate(values: &[f64], attributes: &Map<String, Value>) -> Option<Vec<TimeKey>> {
    let units = attributes
        .get("units")
        .and_then(Value::as_str)
        .and_then(CfTimeUnits::parse);

    match units {
        Some(units) => values
            .iter()
            .map(|&v| units.decode(v).map(TimeKey::Date))
            .collect(),
        None => values
            .iter()
            .map(|&v| (v.is_finite() && v.fract() == 0.0).then_some(TimeKey::Id(v as i64)))
            .collect(),
    }
}
