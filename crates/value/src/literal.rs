//! Inline SQL literals for DDL defaults and raw-SQL output

use crate::codec::{Error, Result};
use crate::coercion::{CodecConfig, coerce};
use crate::data_type::ColumnType;
use crate::types::{TypedValue, Value};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// The backend function that yields the commit-time timestamp.
pub const CURRENT_TIMESTAMP: &str = "CURRENT_TIMESTAMP()";

/// Render a typed value as an inline SQL literal.
pub fn encode_literal(typed: &TypedValue) -> Result<String> {
    let mut out = String::new();
    write_literal(typed.value(), &mut out)?;
    Ok(out)
}

fn write_literal(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Null => out.push_str("NULL"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Int64(i) => out.push_str(&i.to_string()),
        Value::Float64(f) => {
            if !f.is_finite() {
                return Err(Error::TypeMismatch {
                    expected: "finite float64".into(),
                    found: f.to_string(),
                });
            }
            out.push_str(&format!("{:?}", f));
        }
        Value::Numeric(n) => out.push_str(n.as_str()),
        Value::String(s) => out.push_str(&quote_string(s)),
        Value::Bytes(b) => {
            out.push_str("FROM_BASE64(\"");
            out.push_str(&STANDARD.encode(b));
            out.push_str("\")");
        }
        Value::Date(d) => {
            out.push_str(&format!("DATE \"{}\"", d.format("%Y-%m-%d")));
        }
        Value::Timestamp(ts) => {
            out.push_str(&format!(
                "TIMESTAMP \"{}\"",
                ts.format("%Y-%m-%dT%H:%M:%S%.6f+00:00")
            ));
        }
        Value::Json(j) => {
            out.push_str("JSON ");
            out.push_str(&quote_string(&j.to_string()));
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_literal(item, out)?;
            }
            out.push(']');
        }
    }
    Ok(())
}

/// Quote text as a string literal.
///
/// Text spanning lines uses the raw triple-quoted form so the newline is
/// kept as written; only `"` needs escaping there. Backslashes are not
/// escapable in a raw literal, so text containing one always takes the
/// escaped form.
pub fn quote_string(text: &str) -> String {
    if text.contains('\n') && !text.contains('\\') {
        return format!("r\"\"\"{}\"\"\"", text.replace('"', "\\\""));
    }

    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' | '"' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// A column default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DefaultExpression {
    /// A host value, coerced and rendered as a literal
    Value(Value),
    /// The commit timestamp, rendered as a function call
    CurrentTimestamp,
    /// SQL emitted verbatim
    Raw(String),
}

impl DefaultExpression {
    pub fn value(value: impl Into<Value>) -> Self {
        DefaultExpression::Value(value.into())
    }
}

impl From<Value> for DefaultExpression {
    fn from(value: Value) -> Self {
        DefaultExpression::Value(value)
    }
}

/// Render the expression inside a column's `default (...)` clause.
pub fn encode_default(
    ty: &ColumnType,
    default: &DefaultExpression,
    config: &CodecConfig,
) -> Result<String> {
    match default {
        DefaultExpression::Value(value) => {
            let coerced = coerce(ty, value.clone(), config)?;
            encode_literal(&TypedValue::new(ty.clone(), coerced)?)
        }
        DefaultExpression::CurrentTimestamp => {
            if *ty != ColumnType::Timestamp {
                return Err(Error::TypeMismatch {
                    expected: "timestamp column for current timestamp".into(),
                    found: ty.to_string(),
                });
            }
            Ok(CURRENT_TIMESTAMP.to_string())
        }
        DefaultExpression::Raw(sql) => Ok(sql.clone()),
    }
}
