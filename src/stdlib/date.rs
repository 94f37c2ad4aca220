//! Date functions: TODAY, NOW, YEAR, MONTH, DAY, DATEDIFF, DATEADD
//!
//! Dates are accepted as ISO strings (`2024-03-01`, RFC 3339, or a naive
//! `YYYY-MM-DDTHH:MM:SS`) or as epoch milliseconds. All calendar math is in UTC.
//! Unreadable dates give NaN for the numeric functions.

use super::arg;
use crate::error::ExpressionError;
use crate::value::Value;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use std::collections::HashMap;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Interpret a value as a UTC instant
pub fn to_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(ms) if ms.is_finite() => DateTime::from_timestamp_millis(*ms as i64),
        Value::String(s) => parse_date_string(s.trim()),
        _ => None,
    }
}

fn parse_date_string(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc());
        }
    }
    None
}

fn date_part(value: &Value, part: fn(&DateTime<Utc>) -> u32) -> Value {
    match to_datetime(value) {
        Some(dt) => Value::Number(part(&dt) as f64),
        None => Value::Number(f64::NAN),
    }
}

/// Initialize the date group
pub fn init() -> HashMap<String, Value> {
    let mut module: HashMap<String, Value> = HashMap::new();

    // TODAY() -> "YYYY-MM-DD" (UTC)
    module.insert("TODAY".to_string(), Value::NativeFunction {
        name: "TODAY".to_string(),
        func: |_args| Ok(Value::String(Utc::now().format("%Y-%m-%d").to_string())),
    });

    // NOW() -> ISO 8601 timestamp with milliseconds, e.g. 2024-03-01T09:30:00.000Z
    module.insert("NOW".to_string(), Value::NativeFunction {
        name: "NOW".to_string(),
        func: |_args| {
            Ok(Value::String(
                Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            ))
        },
    });

    // YEAR(date) -> Number
    module.insert("YEAR".to_string(), Value::NativeFunction {
        name: "YEAR".to_string(),
        func: |args| {
            Ok(match to_datetime(arg(args, 0)) {
                Some(dt) => Value::Number(dt.year() as f64),
                None => Value::Number(f64::NAN),
            })
        },
    });

    // MONTH(date) -> Number, 1 = January
    module.insert("MONTH".to_string(), Value::NativeFunction {
        name: "MONTH".to_string(),
        func: |args| Ok(date_part(arg(args, 0), |dt| dt.month())),
    });

    // DAY(date) -> Number, day of month
    module.insert("DAY".to_string(), Value::NativeFunction {
        name: "DAY".to_string(),
        func: |args| Ok(date_part(arg(args, 0), |dt| dt.day())),
    });

    // DATEDIFF(start, end) -> Number of whole days between, absolute, partial days round up
    module.insert("DATEDIFF".to_string(), Value::NativeFunction {
        name: "DATEDIFF".to_string(),
        func: |args| {
            let days = match (to_datetime(arg(args, 0)), to_datetime(arg(args, 1))) {
                (Some(start), Some(end)) => {
                    let millis = (end - start).num_milliseconds().abs() as f64;
                    (millis / MILLIS_PER_DAY).ceil()
                }
                _ => f64::NAN,
            };
            Ok(Value::Number(days))
        },
    });

    // DATEADD(date, days) -> "YYYY-MM-DD"
    module.insert("DATEADD".to_string(), Value::NativeFunction {
        name: "DATEADD".to_string(),
        func: |args| {
            let invalid = || ExpressionError::type_error("DATEADD() received an invalid date");
            let start = to_datetime(arg(args, 0)).ok_or_else(invalid)?;
            let days = arg(args, 1).to_number();
            if !days.is_finite() {
                return Err(invalid());
            }
            let result = Duration::try_days(days.trunc() as i64)
                .and_then(|delta| start.checked_add_signed(delta))
                .ok_or_else(invalid)?;
            Ok(Value::String(result.format("%Y-%m-%d").to_string()))
        },
    });

    module
}
