//! Conversion of host convenience values into column-typed values
//!
//! Coercion runs before validation, so callers can hand a date string to a
//! DATE column or an integer to a NUMERIC one. Naive date-times are read in
//! the configured timezone; there is no process-wide default.

use crate::codec::{Error, Result};
use crate::data_type::ColumnType;
use crate::numeric::Numeric;
use crate::types::Value;
use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};

/// Codec settings that affect how host values are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Offset applied to date-times that carry no offset of their own
    pub timezone: FixedOffset,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            timezone: Utc.fix(),
        }
    }
}

impl CodecConfig {
    pub fn with_timezone(mut self, timezone: FixedOffset) -> Self {
        self.timezone = timezone;
        self
    }
}

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Coerce `value` toward `ty`. Values that need no conversion pass through
/// unchanged; whether they fit is decided by validation afterwards.
///
/// Floats are never turned into NUMERIC and strings never into BYTES.
pub fn coerce(ty: &ColumnType, value: Value, config: &CodecConfig) -> Result<Value> {
    match (ty, value) {
        (_, Value::Null) => Ok(Value::Null),
        (ColumnType::Date, Value::String(s)) => parse_date(&s).map(Value::Date),
        (ColumnType::Date, Value::Timestamp(ts)) => Ok(Value::Date(
            ts.with_timezone(&config.timezone).date_naive(),
        )),
        (ColumnType::Timestamp, Value::String(s)) => {
            parse_timestamp(&s, config).map(Value::Timestamp)
        }
        (ColumnType::Timestamp, Value::Date(d)) => {
            localize(d.and_time(NaiveTime::MIN), config).map(Value::Timestamp)
        }
        (ColumnType::Numeric, Value::String(s)) => Numeric::parse(&s).map(Value::Numeric),
        (ColumnType::Numeric, Value::Int64(i)) => Ok(Value::Numeric(Numeric::from(i))),
        (ColumnType::Float64, Value::Int64(i)) => Ok(Value::Float64(i as f64)),
        (ColumnType::Json, Value::String(s)) => serde_json::from_str(&s)
            .map(Value::Json)
            .map_err(|_| Error::TypeMismatch {
                expected: "JSON text".into(),
                found: format!("'{}'", s),
            }),
        (ColumnType::Array(elem), Value::Array(items)) => items
            .into_iter()
            .map(|item| coerce(elem, item, config))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        (_, value) => Ok(value),
    }
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| Error::TypeMismatch {
        expected: "date".into(),
        found: format!("'{}'", text),
    })
}

fn parse_timestamp(text: &str, config: &CodecConfig) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return localize(naive, config);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return localize(date.and_time(NaiveTime::MIN), config);
    }

    Err(Error::TypeMismatch {
        expected: "timestamp".into(),
        found: format!("'{}'", text),
    })
}

fn localize(naive: NaiveDateTime, config: &CodecConfig) -> Result<DateTime<Utc>> {
    config
        .timezone
        .from_local_datetime(&naive)
        .single()
        .map(|ts| ts.with_timezone(&Utc))
        .ok_or_else(|| Error::TypeMismatch {
            expected: "timestamp".into(),
            found: naive.to_string(),
        })
}
