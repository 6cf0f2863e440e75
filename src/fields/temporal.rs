//! Codec for the tagged date/datetime/time/Decimal structs on the wire
//!
//! The server encodes these as JSON objects carrying a `__class__` tag, e.g.
//! `{"__class__": "date", "year": 2024, "month": 3, "day": 5}`.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde_json::{Map, Value, json};

pub const CLASS_KEY: &str = "__class__";

fn class_of(value: &Value) -> Option<&str> {
    value.get(CLASS_KEY).and_then(|c| c.as_str())
}

/// A missing component is zero; a present one must be a non-negative
/// integer that fits in `u32`
fn component(obj: &Map<String, Value>, key: &str) -> Option<u32> {
    match obj.get(key) {
        None | Some(Value::Null) => Some(0),
        Some(v) => u32::try_from(v.as_u64()?).ok(),
    }
}

/// Decode a date or datetime into a single instant; missing time parts are
/// zero. ISO strings are accepted as well.
pub fn decode_instant(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Object(obj) => {
            match class_of(value) {
                Some("date") | Some("datetime") => {}
                _ => return None,
            }
            let year = i32::try_from(obj.get("year")?.as_i64()?).ok()?;
            let date = NaiveDate::from_ymd_opt(year, component(obj, "month")?, component(obj, "day")?)?;
            date.and_hms_micro_opt(
                component(obj, "hour")?,
                component(obj, "minute")?,
                component(obj, "second")?,
                component(obj, "microsecond")?,
            )
        }
        Value::String(s) => parse_iso_instant(s),
        _ => None,
    }
}

/// Parse user or server supplied ISO-8601 text; a bare date means midnight
pub fn parse_iso_instant(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn encode_date(instant: &NaiveDateTime) -> Value {
    let date = instant.date();
    json!({
        CLASS_KEY: "date",
        "year": date.year(),
        "month": date.month(),
        "day": date.day(),
    })
}

pub fn encode_datetime(instant: &NaiveDateTime) -> Value {
    let date = instant.date();
    json!({
        CLASS_KEY: "datetime",
        "year": date.year(),
        "month": date.month(),
        "day": date.day(),
        "hour": instant.hour(),
        "minute": instant.minute(),
        "second": instant.second(),
        "microsecond": instant.nanosecond() / 1_000,
    })
}

pub fn decode_time(value: &Value) -> Option<NaiveTime> {
    match value {
        Value::Object(obj) if class_of(value) == Some("time") => NaiveTime::from_hms_micro_opt(
            component(obj, "hour")?,
            component(obj, "minute")?,
            component(obj, "second")?,
            component(obj, "microsecond")?,
        ),
        Value::String(s) => NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(s.trim(), "%H:%M"))
            .ok(),
        _ => None,
    }
}

pub fn encode_time(time: &NaiveTime) -> Value {
    json!({
        CLASS_KEY: "time",
        "hour": time.hour(),
        "minute": time.minute(),
        "second": time.second(),
        "microsecond": time.nanosecond() / 1_000,
    })
}

/// Decimal values travel as `{"__class__": "Decimal", "decimal": "12.50"}`
pub fn decode_decimal(value: &Value) -> Option<String> {
    match value {
        Value::Object(_) if class_of(value) == Some("Decimal") => {
            value.get("decimal").and_then(|d| d.as_str()).map(str::to_string)
        }
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn encode_decimal(text: &str) -> Value {
    json!({ CLASS_KEY: "Decimal", "decimal": text })
}
