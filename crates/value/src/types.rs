//! Host-side values and their typed pairing with Spanner column types

use crate::codec::{Error, Result};
use crate::data_type::{ColumnType, Length};
use crate::numeric::Numeric;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A row of values
pub type Row = Vec<Value>;

/// A host value that can be stored in a Spanner column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    Numeric(Numeric),
    String(String),
    /// Opaque binary data. Never reinterpreted as text.
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
    Array(Vec<Value>),
}

impl Value {
    // ========================================================================
    // Constructors
    // ========================================================================

    pub fn null() -> Self {
        Value::Null
    }

    pub fn string<S: Into<String>>(s: S) -> Self {
        Value::String(s.into())
    }

    pub fn bytes<B: Into<Vec<u8>>>(b: B) -> Self {
        Value::Bytes(b.into())
    }

    /// Create an array value from anything convertible to values
    pub fn array<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Value::Array(items.into_iter().map(Into::into).collect())
    }

    /// Parse decimal text into a NUMERIC value
    pub fn numeric(text: &str) -> Result<Self> {
        Numeric::parse(text).map(Value::Numeric)
    }

    // ========================================================================
    // Type Checks
    // ========================================================================

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int64(_) => "int64",
            Value::Float64(_) => "float64",
            Value::Numeric(_) => "numeric",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Timestamp(_) => "timestamp",
            Value::Json(_) => "json",
            Value::Array(_) => "array",
        }
    }

    /// Check that this value is representable by `ty`.
    ///
    /// NULL is accepted for every type at the top level, but never as an
    /// array element.
    pub fn check_type(&self, ty: &ColumnType) -> Result<()> {
        let mismatch = || Error::TypeMismatch {
            expected: ty.to_string(),
            found: self.type_name().into(),
        };

        match (ty, self) {
            (_, Value::Null) => Ok(()),
            (ColumnType::Bool, Value::Bool(_))
            | (ColumnType::Int64, Value::Int64(_))
            | (ColumnType::Numeric, Value::Numeric(_))
            | (ColumnType::Date, Value::Date(_))
            | (ColumnType::Timestamp, Value::Timestamp(_))
            | (ColumnType::Json, Value::Json(_)) => Ok(()),
            (ColumnType::Float64, Value::Float64(f)) => {
                if f.is_finite() {
                    Ok(())
                } else {
                    Err(Error::TypeMismatch {
                        expected: "finite float64".into(),
                        found: f.to_string(),
                    })
                }
            }
            (ColumnType::String(len), Value::String(s)) => {
                check_length(len, s.chars().count(), ty)
            }
            (ColumnType::Bytes(len), Value::Bytes(b)) => check_length(len, b.len(), ty),
            (ColumnType::Array(elem), Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    if item.is_null() {
                        return Err(Error::TypeMismatch {
                            expected: format!("non-null {} element", elem),
                            found: format!("null at position {}", i),
                        });
                    }
                    item.check_type(elem)?;
                }
                Ok(())
            }
            _ => Err(mismatch()),
        }
    }

    /// The natural column type of this value, if it can be determined.
    pub fn inferred_type(&self) -> Result<ColumnType> {
        Ok(match self {
            Value::Null => {
                return Err(Error::TypeMismatch {
                    expected: "declared column type".into(),
                    found: "untyped null".into(),
                });
            }
            Value::Bool(_) => ColumnType::Bool,
            Value::Int64(_) => ColumnType::Int64,
            Value::Float64(_) => ColumnType::Float64,
            Value::Numeric(_) => ColumnType::Numeric,
            Value::String(_) => ColumnType::String(Length::Max),
            Value::Bytes(_) => ColumnType::Bytes(Length::Max),
            Value::Date(_) => ColumnType::Date,
            Value::Timestamp(_) => ColumnType::Timestamp,
            Value::Json(_) => ColumnType::Json,
            Value::Array(items) => {
                let first = items.iter().find(|v| !v.is_null()).ok_or_else(|| {
                    Error::TypeMismatch {
                        expected: "array with a typed element".into(),
                        found: "empty array".into(),
                    }
                })?;
                ColumnType::array(first.inferred_type()?)?
            }
        })
    }
}

fn check_length(len: &Length, actual: usize, ty: &ColumnType) -> Result<()> {
    if len.admits(actual) {
        Ok(())
    } else {
        Err(Error::TypeMismatch {
            expected: ty.to_string(),
            found: format!("length {}", actual),
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int64(i) => write!(f, "{}", i),
            Value::Float64(fl) => write!(f, "{:?}", fl),
            Value::Numeric(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Date(d) => write!(f, "{}", d),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Value::Json(j) => write!(f, "{}", j),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

// ============================================================================
// Host conversions
// ============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int64(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int64(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float64(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<Numeric> for Value {
    fn from(n: Numeric) -> Self {
        Value::Numeric(n)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Value {
    fn from(ts: DateTime<Tz>) -> Self {
        Value::Timestamp(ts.with_timezone(&Utc))
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::String(u.hyphenated().to_string())
    }
}

impl From<serde_json::Value> for Value {
    fn from(j: serde_json::Value) -> Self {
        Value::Json(j)
    }
}

impl TryFrom<Decimal> for Value {
    type Error = Error;

    fn try_from(d: Decimal) -> Result<Self> {
        Numeric::try_from(d).map(Value::Numeric)
    }
}

impl<T: Into<Value>> FromIterator<T> for Value {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Value::array(iter)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

// ============================================================================
// TypedValue
// ============================================================================

/// A value paired with the column type it is declared as.
///
/// Construction validates that the value is representable by the type, so
/// every `TypedValue` can be encoded without further shape checks.
/// Deserialization runs the same validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TypedValueRepr")]
pub struct TypedValue {
    column_type: ColumnType,
    value: Value,
}

impl TypedValue {
    pub fn new(column_type: ColumnType, value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        value.check_type(&column_type)?;
        Ok(Self { column_type, value })
    }

    /// A typed NULL
    pub fn null(column_type: ColumnType) -> Self {
        Self {
            column_type,
            value: Value::Null,
        }
    }

    /// Pair a value with its natural type. Untyped NULLs and empty arrays
    /// cannot be inferred.
    pub fn infer(value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        let column_type = value.inferred_type()?;
        Self::new(column_type, value)
    }

    pub fn column_type(&self) -> &ColumnType {
        &self.column_type
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn into_parts(self) -> (ColumnType, Value) {
        (self.column_type, self.value)
    }
}

#[derive(Deserialize)]
struct TypedValueRepr {
    column_type: ColumnType,
    value: Value,
}

impl TryFrom<TypedValueRepr> for TypedValue {
    type Error = Error;

    fn try_from(repr: TypedValueRepr) -> Result<Self> {
        TypedValue::new(repr.column_type, repr.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn test_typed_value_validation() {
        assert!(TypedValue::new(ColumnType::Int64, 1i64).is_ok());
        assert!(TypedValue::new(ColumnType::Int64, "1").is_err());
        assert!(TypedValue::new(ColumnType::Float64, f64::NAN).is_err());
        assert!(TypedValue::new(ColumnType::Float64, f64::INFINITY).is_err());
        assert!(TypedValue::new(ColumnType::Bool, Value::Null).is_ok());
    }

    #[test]
    fn test_bounded_string_counts_characters() {
        let ty = ColumnType::String(Length::bounded(2).unwrap());
        assert!(TypedValue::new(ty.clone(), "表表").is_ok());
        assert!(TypedValue::new(ty, "abc").is_err());

        let ty = ColumnType::Bytes(Length::bounded(2).unwrap());
        assert!(TypedValue::new(ty.clone(), vec![0u8, 1]).is_ok());
        assert!(TypedValue::new(ty, vec![0u8, 1, 2]).is_err());
    }

    #[test]
    fn test_array_elements() {
        let ty = ColumnType::array(ColumnType::Int64).unwrap();
        assert!(TypedValue::new(ty.clone(), Value::array([1i64, 2])).is_ok());
        assert!(TypedValue::new(ty.clone(), Value::Array(vec![])).is_ok());
        assert!(TypedValue::new(ty.clone(), Value::Null).is_ok());

        let with_null = Value::Array(vec![Value::Int64(1), Value::Null]);
        assert!(matches!(
            TypedValue::new(ty.clone(), with_null),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(TypedValue::new(ty, Value::array(["a"])).is_err());
    }

    #[test]
    fn test_nested_arrays_rejected() {
        let inner = ColumnType::int64_array();
        assert!(ColumnType::array(inner.clone()).is_err());

        let nested = Value::Array(vec![Value::array([1i64])]);
        assert!(matches!(
            TypedValue::new(inner, nested.clone()),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(TypedValue::infer(nested).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let typed: TypedValue =
            serde_json::from_str(r#"{"column_type":"Int64","value":{"Int64":7}}"#).unwrap();
        assert_eq!(typed.value(), &Value::Int64(7));

        let mismatched = r#"{"column_type":"Int64","value":{"String":"x"}}"#;
        assert!(serde_json::from_str::<TypedValue>(mismatched).is_err());

        let too_long = r#"{"column_type":{"String":{"Bounded":1}},"value":{"String":"ab"}}"#;
        assert!(serde_json::from_str::<TypedValue>(too_long).is_err());

        let null_element = r#"{"column_type":{"Array":"Bool"},"value":{"Array":["Null"]}}"#;
        assert!(serde_json::from_str::<TypedValue>(null_element).is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let typed = TypedValue::new(ColumnType::int64_array(), Value::array([1i64, 2])).unwrap();
        let json = serde_json::to_string(&typed).unwrap();
        assert_eq!(serde_json::from_str::<TypedValue>(&json).unwrap(), typed);
    }

    #[test]
    fn test_empty_array_distinct_from_null() {
        let ty = ColumnType::array(ColumnType::Bool).unwrap();
        let empty = TypedValue::new(ty.clone(), Value::Array(vec![])).unwrap();
        let null = TypedValue::null(ty);
        assert_ne!(empty, null);
    }

    #[test]
    fn test_infer() {
        assert_eq!(
            TypedValue::infer("x").unwrap().column_type(),
            &ColumnType::string_max()
        );
        assert_eq!(
            TypedValue::infer(Value::array([1.5, 2.5])).unwrap().column_type(),
            &ColumnType::array(ColumnType::Float64).unwrap()
        );
        assert!(TypedValue::infer(Value::Null).is_err());
        assert!(TypedValue::infer(Value::Array(vec![])).is_err());
    }

    #[test]
    fn test_timestamp_normalized_to_utc() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let local = tokyo.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let Value::Timestamp(ts) = Value::from(local) else {
            panic!("expected timestamp");
        };
        assert_eq!(ts, Utc.with_ymd_and_hms(1999, 12, 31, 15, 0, 0).unwrap());
    }

    #[test]
    fn test_uuid_as_string() {
        let id = Uuid::nil();
        assert_eq!(
            Value::from(id),
            Value::String("00000000-0000-0000-0000-000000000000".into())
        );
    }
}
