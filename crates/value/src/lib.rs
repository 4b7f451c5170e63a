//! Spanql Value - Spanner column types and value marshaling
//!
//! This crate provides:
//! - `ColumnType`, the backend's strict type system (scalars and arrays of scalars)
//! - `Value` and `TypedValue`, host values paired with their declared type
//! - Exact NUMERIC decimals that never pass through a binary float
//! - Inline literal rendering for DDL defaults and raw SQL
//! - JSON wire encoding for bound parameters and result cells

pub mod codec;
pub mod coercion;
pub mod data_type;
pub mod literal;
pub mod numeric;
pub mod types;

pub use codec::{Error, Result, WireValue, decode, encode_bound};
pub use coercion::{CodecConfig, coerce};
pub use data_type::{ArrayElement, ColumnType, Length};
pub use literal::{CURRENT_TIMESTAMP, DefaultExpression, encode_default, encode_literal, quote_string};
pub use numeric::Numeric;
pub use types::{Row, TypedValue, Value};
