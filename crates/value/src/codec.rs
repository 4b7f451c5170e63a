//! Wire encoding for bound parameters and result cells
//!
//! The backend exchanges values as JSON: 64-bit integers and NUMERIC travel
//! as decimal strings, BYTES as base64, timestamps as RFC 3339 in UTC.

use crate::data_type::ColumnType;
use crate::numeric::Numeric;
use crate::types::{TypedValue, Value};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Decoding error: {0}")]
    Decoding(String),
}

/// A value in the backend's JSON wire representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WireValue(serde_json::Value);

impl WireValue {
    pub fn null() -> Self {
        WireValue(serde_json::Value::Null)
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_json(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for WireValue {
    fn from(json: serde_json::Value) -> Self {
        WireValue(json)
    }
}

const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// Encoding
// ============================================================================

/// Encode a typed value for parameterized binding.
pub fn encode_bound(typed: &TypedValue) -> Result<WireValue> {
    encode_wire(typed.value()).map(WireValue)
}

fn encode_wire(value: &Value) -> Result<serde_json::Value> {
    use serde_json::Value as Json;

    Ok(match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int64(i) => Json::String(i.to_string()),
        Value::Float64(f) => {
            Json::Number(
                serde_json::Number::from_f64(*f).ok_or_else(|| Error::TypeMismatch {
                    expected: "finite float64".into(),
                    found: f.to_string(),
                })?,
            )
        }
        Value::Numeric(n) => Json::String(n.to_string()),
        Value::String(s) => Json::String(s.clone()),
        Value::Bytes(b) => Json::String(STANDARD.encode(b)),
        Value::Date(d) => Json::String(d.format(DATE_FORMAT).to_string()),
        Value::Timestamp(ts) => Json::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        Value::Json(j) => Json::String(j.to_string()),
        Value::Array(items) => Json::Array(
            items
                .iter()
                .map(encode_wire)
                .collect::<Result<Vec<_>>>()?,
        ),
    })
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode a result cell of the given column type.
pub fn decode(ty: &ColumnType, wire: &WireValue) -> Result<Value> {
    decode_json(ty, &wire.0)
}

fn decode_json(ty: &ColumnType, json: &serde_json::Value) -> Result<Value> {
    use serde_json::Value as Json;

    if json.is_null() {
        return Ok(Value::Null);
    }

    let malformed = || Error::Decoding(format!("invalid {} value: {}", ty.type_code(), json));

    match ty {
        ColumnType::Bool => json.as_bool().map(Value::Bool).ok_or_else(malformed),
        ColumnType::Int64 => match json {
            Json::String(s) => s.parse().map(Value::Int64).map_err(|_| malformed()),
            Json::Number(n) => n.as_i64().map(Value::Int64).ok_or_else(malformed),
            _ => Err(malformed()),
        },
        ColumnType::Float64 => match json {
            Json::Number(n) => n.as_f64().map(Value::Float64).ok_or_else(malformed),
            Json::String(s) => match s.as_str() {
                "NaN" => Ok(Value::Float64(f64::NAN)),
                "Infinity" => Ok(Value::Float64(f64::INFINITY)),
                "-Infinity" => Ok(Value::Float64(f64::NEG_INFINITY)),
                _ => Err(malformed()),
            },
            _ => Err(malformed()),
        },
        ColumnType::Numeric => {
            let text = json.as_str().ok_or_else(malformed)?;
            Numeric::parse(text)
                .map(Value::Numeric)
                .map_err(|_| malformed())
        }
        ColumnType::String(_) => json
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(malformed),
        ColumnType::Bytes(_) => {
            let text = json.as_str().ok_or_else(malformed)?;
            STANDARD
                .decode(text)
                .map(Value::Bytes)
                .map_err(|e| Error::Decoding(format!("invalid base64: {}", e)))
        }
        ColumnType::Date => {
            let text = json.as_str().ok_or_else(malformed)?;
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .map(Value::Date)
                .map_err(|_| malformed())
        }
        ColumnType::Timestamp => {
            let text = json.as_str().ok_or_else(malformed)?;
            DateTime::parse_from_rfc3339(text)
                .map(|ts| Value::Timestamp(ts.with_timezone(&Utc)))
                .map_err(|_| malformed())
        }
        ColumnType::Json => {
            let text = json.as_str().ok_or_else(malformed)?;
            serde_json::from_str(text)
                .map(Value::Json)
                .map_err(|e| Error::Decoding(format!("invalid JSON text: {}", e)))
        }
        ColumnType::Array(elem) => {
            let items = json.as_array().ok_or_else(malformed)?;
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                if item.is_null() {
                    return Err(Error::Decoding(format!(
                        "null element in {} array",
                        elem.type_code()
                    )));
                }
                values.push(decode_json(elem, item)?);
            }
            Ok(Value::Array(values))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::Length;
    use chrono::{FixedOffset, TimeZone};
    use serde_json::json;

    fn round_trip(ty: ColumnType, value: Value) {
        let typed = TypedValue::new(ty.clone(), value.clone()).unwrap();
        let wire = encode_bound(&typed).unwrap();
        assert_eq!(decode(&ty, &wire).unwrap(), value, "wire form {:?}", wire);
    }

    #[test]
    fn test_round_trip_scalars() {
        round_trip(ColumnType::Bool, Value::Bool(true));
        round_trip(ColumnType::Int64, Value::Int64(i64::MIN));
        round_trip(ColumnType::Float64, Value::Float64(1.1));
        round_trip(ColumnType::Numeric, Value::numeric("-123.456789").unwrap());
        round_trip(ColumnType::string_max(), Value::string("tes't\n\"x\""));
        round_trip(ColumnType::bytes_max(), Value::bytes(vec![0xff, 0x00, 0xc3]));
        round_trip(
            ColumnType::Date,
            Value::Date(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap()),
        );
        round_trip(ColumnType::Json, Value::Json(json!({"a": [1, 2, 3]})));
        round_trip(ColumnType::Timestamp, Value::Null);
    }

    #[test]
    fn test_round_trip_timestamps() {
        let ts = Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        round_trip(ColumnType::Timestamp, Value::Timestamp(ts));

        // A non-UTC offset is the same instant after normalization
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let local = tokyo.with_ymd_and_hms(2021, 3, 4, 14, 6, 7).unwrap();
        round_trip(ColumnType::Timestamp, Value::from(local));
    }

    #[test]
    fn test_round_trip_arrays() {
        let ty = ColumnType::array(ColumnType::Numeric).unwrap();
        round_trip(
            ty.clone(),
            Value::Array(vec![
                Value::numeric("1.5").unwrap(),
                Value::numeric(&format!("{}.{}", "9".repeat(29), "9".repeat(9))).unwrap(),
            ]),
        );
        round_trip(ty, Value::Array(vec![]));

        let ty = ColumnType::string_array(Length::bounded(1).unwrap());
        round_trip(ty, Value::array(["a", "b"]));
    }

    #[test]
    fn test_wire_forms() {
        let wire = encode_bound(&TypedValue::infer(42i64).unwrap()).unwrap();
        assert_eq!(wire.as_json(), &json!("42"));

        let wire = encode_bound(&TypedValue::infer(vec![104u8, 105]).unwrap()).unwrap();
        assert_eq!(wire.as_json(), &json!("aGk="));

        let ts = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
        let wire = encode_bound(&TypedValue::infer(ts).unwrap()).unwrap();
        assert_eq!(wire.as_json(), &json!("2022-01-01T00:00:00Z"));

        let wire = encode_bound(&TypedValue::infer(json!([1, 2])).unwrap()).unwrap();
        assert_eq!(wire.as_json(), &json!("[1,2]"));
    }

    #[test]
    fn test_decode_offset_timestamp() {
        let wire = WireValue::from(json!("2000-01-01T09:00:00+09:00"));
        assert_eq!(
            decode(&ColumnType::Timestamp, &wire).unwrap(),
            Value::Timestamp(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_decode_special_floats() {
        let wire = WireValue::from(json!("-Infinity"));
        assert_eq!(
            decode(&ColumnType::Float64, &wire).unwrap(),
            Value::Float64(f64::NEG_INFINITY)
        );
        let wire = WireValue::from(json!("NaN"));
        let Value::Float64(f) = decode(&ColumnType::Float64, &wire).unwrap() else {
            panic!("expected float");
        };
        assert!(f.is_nan());
    }

    #[test]
    fn test_decode_malformed() {
        let cases = [
            (ColumnType::Int64, json!("4x")),
            (ColumnType::Bool, json!("true")),
            (ColumnType::Numeric, json!(1.5)),
            (ColumnType::bytes_max(), json!("not base64!")),
            (ColumnType::Date, json!("2022-13-01")),
            (ColumnType::Timestamp, json!("2022-01-01 00:00:00")),
            (ColumnType::Json, json!("{")),
            (ColumnType::array(ColumnType::Int64).unwrap(), json!(["1", null])),
        ];
        for (ty, json) in cases {
            assert!(
                matches!(decode(&ty, &WireValue::from(json.clone())), Err(Error::Decoding(_))),
                "decoded {} as {}",
                json,
                ty
            );
        }
    }
}
