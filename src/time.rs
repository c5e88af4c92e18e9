//! # Time Axis
//!
//! Raw time values together with the CF `units` / `calendar` attributes they
//! were stored with. Extraction always works on the raw values; [`TimeAxis::decode`]
//! exists for display only.

use crate::dataset::{is_numeric, read_unpacked, require_variable, string_attribute};
use crate::error::{ExtractError, ExtractResult};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::Path;

const GREGORIAN_CALENDARS: [&str; 3] = ["standard", "gregorian", "proleptic_gregorian"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeAxis {
    pub label: String,
    pub values: Vec<f64>,
    pub units: Option<String>,
    pub calendar: Option<String>,
}

impl TimeAxis {
    /// Reads a one-dimensional time variable with its `units` and `calendar`.
    pub fn read(var: &netcdf::Variable) -> ExtractResult<Self> {
        let rank = var.dimensions().len();
        if rank != 1 {
            return Err(ExtractError::Shape(format!(
                "Time variable '{}' must be 1-dimensional, found {} dimensions",
                var.name(),
                rank
            )));
        }
        if !is_numeric(var) {
            return Err(ExtractError::Unsupported(format!(
                "Time variable '{}' has non-numeric type {:?}",
                var.name(),
                var.vartype()
            )));
        }
        let values: Vec<f64> = read_unpacked(var)?.into_iter().collect();
        if values.is_empty() {
            return Err(ExtractError::Shape(format!(
                "Time variable '{}' is empty",
                var.name()
            )));
        }

        Ok(TimeAxis {
            label: var.name(),
            values,
            units: string_attribute(var, "units")?,
            calendar: string_attribute(var, "calendar")?,
        })
    }

    /// Opens `path`, reads the time variable `label` and closes the file again.
    pub fn open<P: AsRef<Path>>(path: P, label: &str) -> ExtractResult<Self> {
        let file = netcdf::open(path.as_ref())?;
        let var = require_variable(&file, label)?;
        let axis = Self::read(&var)?;
        drop(var);
        file.close()?;
        Ok(axis)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Converts the raw values to timestamps.
    ///
    /// Returns `None` unless the units read `<unit> since <origin>` and the calendar
    /// is absent or one of the Gregorian variants.
    pub fn decode(&self) -> Option<Vec<NaiveDateTime>> {
        if let Some(calendar) = &self.calendar {
            let calendar = calendar.to_ascii_lowercase();
            if !GREGORIAN_CALENDARS.contains(&calendar.as_str()) {
                return None;
            }
        }
        let (unit_seconds, origin) = parse_units(self.units.as_deref()?)?;

        self.values
            .iter()
            .map(|v| {
                if !v.is_finite() {
                    return None;
                }
                let millis = (v * unit_seconds * 1000.0).round() as i64;
                origin.checked_add_signed(Duration::try_milliseconds(millis)?)
            })
            .collect()
    }
}

fn parse_units(units: &str) -> Option<(f64, NaiveDateTime)> {
    let (unit, origin) = units.split_once(" since ")?;
    let unit_seconds = match unit.trim().to_ascii_lowercase().as_str() {
        "second" | "seconds" | "sec" | "secs" | "s" => 1.0,
        "minute" | "minutes" | "min" | "mins" => 60.0,
        "hour" | "hours" | "hr" | "hrs" | "h" => 3600.0,
        "day" | "days" | "d" => 86400.0,
        _ => return None,
    };
    Some((unit_seconds, parse_origin(origin)?))
}

fn parse_origin(origin: &str) -> Option<NaiveDateTime> {
    let origin = origin.trim();
    let origin = origin
        .strip_suffix(" UTC")
        .or_else(|| origin.strip_suffix('Z'))
        .unwrap_or(origin);

    for fmt in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(origin, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(origin, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(values: Vec<f64>, units: Option<&str>, calendar: Option<&str>) -> TimeAxis {
        TimeAxis {
            label: "time".to_string(),
            values,
            units: units.map(str::to_string),
            calendar: calendar.map(str::to_string),
        }
    }

    #[test]
    fn test_decode_days_since_date() {
        let t = axis(vec![0.0, 1.0, 31.0], Some("days since 2000-01-01"), Some("standard"));
        let decoded = t.decode().unwrap();
        assert_eq!(decoded[0].to_string(), "2000-01-01 00:00:00");
        assert_eq!(decoded[1].to_string(), "2000-01-02 00:00:00");
        assert_eq!(decoded[2].to_string(), "2000-02-01 00:00:00");
    }

    #[test]
    fn test_decode_hours_since_datetime() {
        let t = axis(vec![6.0], Some("hours since 1990-05-01 12:00:00"), None);
        let decoded = t.decode().unwrap();
        assert_eq!(decoded[0].to_string(), "1990-05-01 18:00:00");
    }

    #[test]
    fn test_decode_rejects_other_calendars() {
        let t = axis(vec![0.0], Some("days since 2000-01-01"), Some("noleap"));
        assert!(t.decode().is_none());
    }

    #[test]
    fn test_decode_rejects_unknown_units() {
        assert!(axis(vec![0.0], Some("fortnights since 2000-01-01"), None).decode().is_none());
        assert!(axis(vec![0.0], Some("days"), None).decode().is_none());
        assert!(axis(vec![0.0], None, None).decode().is_none());
    }
}
