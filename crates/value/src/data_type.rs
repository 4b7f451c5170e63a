//! Column types of the Spanner type system

use crate::codec::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::ops::Deref;

/// Maximum length of a STRING or BYTES column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Length {
    /// `max`: bounded only by the backend's cell size limit.
    Max,
    /// A positive length, counted in characters for STRING and bytes for BYTES.
    Bounded(NonZeroU32),
}

impl Length {
    /// Create a bounded length. Zero is rejected.
    pub fn bounded(len: u32) -> Result<Self> {
        NonZeroU32::new(len)
            .map(Length::Bounded)
            .ok_or_else(|| Error::TypeMismatch {
                expected: "positive length".into(),
                found: "0".into(),
            })
    }

    /// Whether a value of `len` units fits.
    pub fn admits(&self, len: usize) -> bool {
        match self {
            Length::Max => true,
            Length::Bounded(max) => len <= max.get() as usize,
        }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Length::Max => write!(f, "max"),
            Length::Bounded(len) => write!(f, "{}", len),
        }
    }
}

/// A Spanner column type.
///
/// Arrays of arrays do not exist in the backend. Use [`ColumnType::array`] to
/// build array types from a runtime element type, or one of the scalar
/// constructors such as [`ColumnType::int64_array`]. Deserialization applies
/// the same check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ColumnTypeRepr", into = "ColumnTypeRepr")]
pub enum ColumnType {
    Bool,
    Int64,
    Float64,
    Numeric,
    String(Length),
    Bytes(Length),
    Date,
    Timestamp,
    Json,
    Array(ArrayElement),
}

impl ColumnType {
    /// Build `ARRAY<elem>`, rejecting nested arrays.
    pub fn array(elem: ColumnType) -> Result<Self> {
        if elem.is_array() {
            return Err(Error::TypeMismatch {
                expected: "scalar array element type".into(),
                found: elem.to_string(),
            });
        }
        Ok(ColumnType::Array(ArrayElement(Box::new(elem))))
    }

    fn scalar_array(elem: ColumnType) -> Self {
        ColumnType::Array(ArrayElement(Box::new(elem)))
    }

    pub fn bool_array() -> Self {
        Self::scalar_array(ColumnType::Bool)
    }

    pub fn int64_array() -> Self {
        Self::scalar_array(ColumnType::Int64)
    }

    pub fn float64_array() -> Self {
        Self::scalar_array(ColumnType::Float64)
    }

    pub fn numeric_array() -> Self {
        Self::scalar_array(ColumnType::Numeric)
    }

    pub fn string_array(len: Length) -> Self {
        Self::scalar_array(ColumnType::String(len))
    }

    pub fn bytes_array(len: Length) -> Self {
        Self::scalar_array(ColumnType::Bytes(len))
    }

    pub fn date_array() -> Self {
        Self::scalar_array(ColumnType::Date)
    }

    pub fn timestamp_array() -> Self {
        Self::scalar_array(ColumnType::Timestamp)
    }

    pub fn json_array() -> Self {
        Self::scalar_array(ColumnType::Json)
    }

    /// `STRING(MAX)`
    pub fn string_max() -> Self {
        ColumnType::String(Length::Max)
    }

    /// `BYTES(MAX)`
    pub fn bytes_max() -> Self {
        ColumnType::Bytes(Length::Max)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, ColumnType::Array(_))
    }

    /// Whether the type can drive a row deletion policy.
    pub fn is_temporal(&self) -> bool {
        matches!(self, ColumnType::Date | ColumnType::Timestamp)
    }

    /// The element type for arrays, `None` otherwise.
    pub fn element_type(&self) -> Option<&ColumnType> {
        match self {
            ColumnType::Array(elem) => Some(elem.column_type()),
            _ => None,
        }
    }

    /// The backend's type code, as used in parameter type descriptors.
    pub fn type_code(&self) -> &'static str {
        match self {
            ColumnType::Bool => "BOOL",
            ColumnType::Int64 => "INT64",
            ColumnType::Float64 => "FLOAT64",
            ColumnType::Numeric => "NUMERIC",
            ColumnType::String(_) => "STRING",
            ColumnType::Bytes(_) => "BYTES",
            ColumnType::Date => "DATE",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Json => "JSON",
            ColumnType::Array(_) => "ARRAY",
        }
    }

    /// The JSON type descriptor sent alongside a bound parameter.
    pub fn wire_type(&self) -> serde_json::Value {
        match self {
            ColumnType::Array(elem) => serde_json::json!({
                "code": "ARRAY",
                "arrayElementType": elem.wire_type(),
            }),
            other => serde_json::json!({ "code": other.type_code() }),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Bool => write!(f, "bool"),
            ColumnType::Int64 => write!(f, "int64"),
            ColumnType::Float64 => write!(f, "float64"),
            ColumnType::Numeric => write!(f, "numeric"),
            ColumnType::String(len) => write!(f, "string({})", len),
            ColumnType::Bytes(len) => write!(f, "bytes({})", len),
            ColumnType::Date => write!(f, "date"),
            ColumnType::Timestamp => write!(f, "timestamp"),
            ColumnType::Json => write!(f, "json"),
            ColumnType::Array(elem) => write!(f, "array<{}>", elem),
        }
    }
}

/// The element type of an array column. Never itself an array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArrayElement(Box<ColumnType>);

impl ArrayElement {
    pub fn column_type(&self) -> &ColumnType {
        &self.0
    }
}

impl Deref for ArrayElement {
    type Target = ColumnType;

    fn deref(&self) -> &ColumnType {
        &self.0
    }
}

impl fmt::Display for ArrayElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Serialize, Deserialize)]
enum ColumnTypeRepr {
    Bool,
    Int64,
    Float64,
    Numeric,
    String(Length),
    Bytes(Length),
    Date,
    Timestamp,
    Json,
    Array(Box<ColumnType>),
}

impl TryFrom<ColumnTypeRepr> for ColumnType {
    type Error = Error;

    fn try_from(repr: ColumnTypeRepr) -> Result<Self> {
        Ok(match repr {
            ColumnTypeRepr::Bool => ColumnType::Bool,
            ColumnTypeRepr::Int64 => ColumnType::Int64,
            ColumnTypeRepr::Float64 => ColumnType::Float64,
            ColumnTypeRepr::Numeric => ColumnType::Numeric,
            ColumnTypeRepr::String(len) => ColumnType::String(len),
            ColumnTypeRepr::Bytes(len) => ColumnType::Bytes(len),
            ColumnTypeRepr::Date => ColumnType::Date,
            ColumnTypeRepr::Timestamp => ColumnType::Timestamp,
            ColumnTypeRepr::Json => ColumnType::Json,
            ColumnTypeRepr::Array(elem) => ColumnType::array(*elem)?,
        })
    }
}

impl From<ColumnType> for ColumnTypeRepr {
    fn from(ty: ColumnType) -> Self {
        match ty {
            ColumnType::Bool => ColumnTypeRepr::Bool,
            ColumnType::Int64 => ColumnTypeRepr::Int64,
            ColumnType::Float64 => ColumnTypeRepr::Float64,
            ColumnType::Numeric => ColumnTypeRepr::Numeric,
            ColumnType::String(len) => ColumnTypeRepr::String(len),
            ColumnType::Bytes(len) => ColumnTypeRepr::Bytes(len),
            ColumnType::Date => ColumnTypeRepr::Date,
            ColumnType::Timestamp => ColumnTypeRepr::Timestamp,
            ColumnType::Json => ColumnTypeRepr::Json,
            ColumnType::Array(elem) => ColumnTypeRepr::Array(elem.0),
        }
    }
}
